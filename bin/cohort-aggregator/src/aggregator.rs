//! Wires pollers, execution managers and the rpc server into one running service.

use std::{
    collections::HashMap,
    future::Future,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use alloy_primitives::Address;
use cohort_chain_poller::{
    interesting_contracts, EvmChainPollerBuilder, ManualPushPoller, RpcChainClient,
    SimulatedPoller, SimulatedTaskConfig,
};
use cohort_config::{AggregatorConfig, AvsConfig, ChainConfig, PollerKind};
use cohort_crypto::{InMemorySigner, Signer};
use cohort_execution::{
    ContractCaller, ExecutionError, ExecutionManagerBuilder, ExecutionManagerConfig,
    ExecutionManagerHandle, LocalPeeringDataFetcher, PeeringDataFetcher, RpcExecutorClient,
    SimulatedContractCaller, DEFAULT_QUEUE_CAPACITY,
};
use cohort_primitives::{ChainId, LogWithBlock};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinSet,
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    errors::InitError,
    rpc::{self, AggregatorRpc},
};

/// How long running tasks get to wind down after cancellation.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Events buffered for each manager before the dispatcher drops new ones for it.
const MANAGER_EVENT_BUFFER: usize = DEFAULT_QUEUE_CAPACITY;

/// Long-running pieces of the service. Any of them exiting early stops the whole service.
type CriticalTasks = JoinSet<String>;

fn spawn_critical(tasks: &mut CriticalTasks, name: String, fut: impl Future<Output = ()> + Send + 'static) {
    tasks.spawn(async move {
        fut.await;
        name
    });
}

/// Runs the aggregator until `cancel` fires or a critical task exits.
pub(crate) async fn run(config: AggregatorConfig, cancel: CancellationToken) -> Result<(), InitError> {
    let mut tasks = CriticalTasks::new();

    let signer: Arc<dyn Signer> = Arc::new(InMemorySigner::new(config.operator.signing_key.to_private_key()?));
    let peering: Arc<dyn PeeringDataFetcher> = Arc::new(LocalPeeringDataFetcher::new(
        config.peering.executor_peer_infos()?,
        config.peering.aggregator_peer_infos()?,
    ));
    let callers = contract_callers(&config, &peering);

    let mut managers = Vec::with_capacity(config.avss.len());
    for avs in &config.avss {
        let (handle, fut) = init_manager(&config, avs, signer.clone(), peering.clone(), &callers, &cancel).await?;
        spawn_critical(&mut tasks, format!("execution-manager-{}", avs.address), fut);
        managers.push(handle);
    }

    let (event_tx, event_rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
    for chain in &config.chains {
        start_poller(&config, chain, event_tx.clone(), &cancel, &mut tasks).await?;
    }
    // pollers hold the only senders from here on
    drop(event_tx);

    spawn_critical(
        &mut tasks,
        "event-dispatcher".to_string(),
        dispatch_events(event_rx, managers.clone(), cancel.clone()),
    );

    let rpc_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server.port));
    let (_, server) = rpc::serve(AggregatorRpc::new(managers), rpc_addr, cancel.clone()).await?;
    spawn_critical(&mut tasks, "aggregator-rpc".to_string(), server.stopped());

    info!(
        avss = config.avss.len(),
        chains = config.chains.len(),
        "aggregator started"
    );

    supervise(tasks, cancel).await;
    Ok(())
}

/// One simulated contract caller per configured chain.
fn contract_callers(
    config: &AggregatorConfig,
    peering: &Arc<dyn PeeringDataFetcher>,
) -> HashMap<ChainId, Arc<dyn ContractCaller>> {
    config
        .chains
        .iter()
        .map(|chain| {
            let caller: Arc<dyn ContractCaller> =
                Arc::new(SimulatedContractCaller::new(chain.chain_id, peering.clone()));
            (chain.chain_id, caller)
        })
        .collect()
}

fn manager_config(config: &AggregatorConfig, avs: &AvsConfig) -> Result<ExecutionManagerConfig, InitError> {
    let mailbox_addresses = avs
        .chain_ids
        .iter()
        .map(|chain_id| {
            avs.mailbox_for(*chain_id)
                .map(|mailbox| (*chain_id, mailbox))
                .ok_or(InitError::MissingMailbox(*chain_id))
        })
        .collect::<Result<HashMap<_, _>, _>>()?;

    Ok(ExecutionManagerConfig {
        avs_address: avs.address,
        supported_chains: avs.chain_ids.clone(),
        mailbox_addresses,
        aggregator_address: config.operator.address,
        aggregator_url: config.server.aggregator_url(),
        threshold_percentage: avs.threshold_percentage,
        write_delay: avs.write_delay(),
    })
}

async fn init_manager(
    config: &AggregatorConfig,
    avs: &AvsConfig,
    signer: Arc<dyn Signer>,
    peering: Arc<dyn PeeringDataFetcher>,
    callers: &HashMap<ChainId, Arc<dyn ContractCaller>>,
    cancel: &CancellationToken,
) -> Result<(ExecutionManagerHandle, impl Future<Output = ()>), InitError> {
    let executor_client = Arc::new(RpcExecutorClient::with_request_timeout(avs.response_timeout()));
    let mut builder =
        ExecutionManagerBuilder::new(manager_config(config, avs)?, signer, peering, executor_client);
    for chain_id in &avs.chain_ids {
        if let Some(caller) = callers.get(chain_id) {
            builder = builder.with_contract_caller(*chain_id, caller.clone());
        }
    }

    let (handle, fut) = builder.init(cancel.child_token()).await?;
    info!(avs = %avs.address, chains = ?avs.chain_ids, threshold = avs.threshold_percentage, "execution manager ready");
    Ok((handle, fut))
}

/// Core contracts, configured extras and every AVS mailbox override on the chain.
fn watched_contracts(config: &AggregatorConfig, chain: &ChainConfig) -> Vec<Address> {
    let mut contracts = interesting_contracts(chain.chain_id, &chain.extra_contracts);
    for avs in &config.avss {
        let Some(mailbox) = avs.mailbox_for(chain.chain_id) else {
            continue;
        };
        if !contracts.contains(&mailbox) {
            contracts.push(mailbox);
        }
    }
    contracts
}

async fn start_poller(
    config: &AggregatorConfig,
    chain: &ChainConfig,
    event_tx: mpsc::Sender<LogWithBlock>,
    cancel: &CancellationToken,
    tasks: &mut CriticalTasks,
) -> Result<(), InitError> {
    let chain_id = chain.chain_id;
    match chain.poller_kind() {
        PollerKind::Evm => {
            let client = Arc::new(RpcChainClient::new(chain_id, chain.rpc_url.clone())?);
            let (handle, fut) = EvmChainPollerBuilder::new(chain_id, client, watched_contracts(config, chain), event_tx)
                .with_poll_interval(chain.poll_interval())
                .build(cancel.clone());
            info!(chain = %chain.name, chain_id = %handle.chain_id(), "starting evm poller");
            spawn_critical(tasks, format!("evm-poller-{chain_id}"), fut);
        }
        PollerKind::Manual { port } => {
            let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
            let (local_addr, server) = ManualPushPoller::new(chain_id, event_tx)
                .serve(addr, cancel.clone())
                .await?;
            info!(chain = %chain.name, %chain_id, %local_addr, "started manual poller");
            spawn_critical(tasks, format!("manual-poller-{chain_id}"), server.stopped());
        }
        PollerKind::Simulated {
            port,
            task_interval,
            operator_set_id,
        } => {
            let mailbox = config
                .avss
                .iter()
                .filter(|avs| avs.chain_ids.contains(&chain_id))
                .find_map(|avs| avs.mailbox_for(chain_id))
                .ok_or(InitError::MissingMailbox(chain_id))?;
            let avs_addresses = config
                .avss
                .iter()
                .filter(|avs| avs.chain_ids.contains(&chain_id))
                .map(|avs| avs.address)
                .collect();
            let simulated = SimulatedPoller::new(
                ManualPushPoller::new(chain_id, event_tx),
                SimulatedTaskConfig {
                    task_interval,
                    avs_addresses,
                    mailbox,
                    operator_set_id,
                },
            )?;

            let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
            let (local_addr, server, generator) = simulated.start(addr, cancel.clone()).await?;
            info!(chain = %chain.name, %chain_id, %local_addr, "started simulated poller");
            spawn_critical(tasks, format!("simulated-poller-{chain_id}"), server.stopped());
            spawn_critical(tasks, format!("task-generator-{chain_id}"), generator);
        }
    }
    Ok(())
}

/// Hands every polled event to every execution manager.
///
/// Managers filter events themselves, so the dispatcher has no routing logic of its own. Each
/// manager is fed from its own buffer, so a manager that stops draining only loses its own
/// events.
async fn dispatch_events(
    mut event_rx: mpsc::Receiver<LogWithBlock>,
    managers: Vec<ExecutionManagerHandle>,
    cancel: CancellationToken,
) {
    let mut forwarders = JoinSet::new();
    let queues: Vec<_> = managers
        .into_iter()
        .map(|manager| {
            let (queue_tx, queue_rx) = mpsc::channel(MANAGER_EVENT_BUFFER);
            let avs = manager.avs_address();
            forwarders.spawn(forward_events(queue_rx, manager, cancel.clone()));
            (avs, queue_tx)
        })
        .collect();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = event_rx.recv() => match event {
                Some(event) => event,
                None => {
                    warn!("event queue closed");
                    break;
                }
            },
        };

        let chain_id = event.block.chain_id;
        let block = event.block.number;
        debug!(%chain_id, %block, event = event.log.event.name(), "dispatching event");
        for (avs, queue) in &queues {
            match queue.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(%avs, %chain_id, %block, "manager is falling behind, dropping event")
                }
                Err(TrySendError::Closed(_)) if cancel.is_cancelled() => {}
                Err(TrySendError::Closed(_)) => {
                    warn!(%avs, %chain_id, %block, "manager forwarder stopped, dropping event")
                }
            }
        }
    }

    drop(queues);
    while forwarders.join_next().await.is_some() {}
}

/// Drains one manager's buffer into its handle until cancelled or the manager stops.
async fn forward_events(
    mut queue_rx: mpsc::Receiver<LogWithBlock>,
    manager: ExecutionManagerHandle,
    cancel: CancellationToken,
) {
    let avs = manager.avs_address();
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            event = queue_rx.recv() => match event {
                Some(event) => event,
                None => return,
            },
        };

        let chain_id = event.block.chain_id;
        let block = event.block.number;
        match manager.handle_log(event).await {
            Ok(()) => {}
            Err(ExecutionError::ManagerStopped) if cancel.is_cancelled() => return,
            Err(err) => warn!(%avs, %chain_id, %block, %err, "failed to hand event to manager"),
        }
    }
}

/// Waits for cancellation or the first critical task to exit, then drains the rest.
async fn supervise(mut tasks: CriticalTasks, cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => info!("shutdown requested"),
        exited = tasks.join_next() => {
            match exited {
                Some(Ok(name)) => error!(task = %name, "critical task exited, shutting down"),
                Some(Err(err)) => error!(%err, "critical task failed, shutting down"),
                None => warn!("no critical tasks running"),
            }
            cancel.cancel();
        }
    }

    let drained = timeout(SHUTDOWN_TIMEOUT, async {
        while let Some(res) = tasks.join_next().await {
            match res {
                Ok(name) => debug!(task = %name, "task stopped"),
                Err(err) => warn!(%err, "task failed during shutdown"),
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(remaining = tasks.len(), "shutdown timed out, aborting remaining tasks");
        tasks.abort_all();
    }
    info!("aggregator stopped");
}
