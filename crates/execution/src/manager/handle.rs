use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use alloy_primitives::Address;
use cohort_crypto::Signer;
use cohort_primitives::{ChainId, LogWithBlock, TaskId, TaskResult};
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{
    ctx::ExecutionManagerCtx, task::execution_manager_task, ExecutionManagerConfig, ManagerState,
    DEFAULT_QUEUE_CAPACITY, EVENT_ENQUEUE_TIMEOUT,
};
use crate::{
    contract_caller::ContractCaller,
    errors::{ExecutionError, Result},
    executor_client::ExecutorClient,
    peering::PeeringDataFetcher,
    session::{RecordOutcome, TaskSession},
};

/// Handle for feeding chain events and executor results into a running manager.
#[derive(Clone)]
pub struct ExecutionManagerHandle {
    avs_address: Address,
    event_tx: mpsc::Sender<LogWithBlock>,
    inflight: Arc<DashMap<TaskId, Arc<TaskSession>>>,
    finalized: Arc<DashMap<TaskId, u64>>,
}

impl fmt::Debug for ExecutionManagerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionManagerHandle")
            .field("avs_address", &self.avs_address)
            .field("inflight", &self.inflight.len())
            .field("finalized", &self.finalized.len())
            .finish()
    }
}

impl ExecutionManagerHandle {
    pub fn avs_address(&self) -> Address {
        self.avs_address
    }

    /// Queues a chain event for the manager loop.
    ///
    /// Waits up to [`EVENT_ENQUEUE_TIMEOUT`] for room in the queue.
    pub async fn handle_log(&self, event: LogWithBlock) -> Result<()> {
        self.event_tx
            .send_timeout(event, EVENT_ENQUEUE_TIMEOUT)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => ExecutionError::QueueFull("event"),
                SendTimeoutError::Closed(_) => ExecutionError::ManagerStopped,
            })
    }

    /// Routes an executor result to the session for its task.
    ///
    /// Results for a task that finalized and whose deadline has not yet passed are answered
    /// with [`RecordOutcome::AlreadyFinalized`] even after its session has exited.
    pub fn handle_task_result_from_executor(&self, result: &TaskResult) -> RecordOutcome {
        // clone out so the map shard lock isn't held while verifying
        let session = self
            .inflight
            .get(&result.task_id)
            .map(|entry| entry.value().clone());
        match session {
            Some(session) => session.record_result(result),
            None if self.finalized.contains_key(&result.task_id) => RecordOutcome::AlreadyFinalized,
            None => RecordOutcome::UnknownTask,
        }
    }

    /// Number of sessions currently collecting results.
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }
}

/// Assembles an execution manager for one AVS.
pub struct ExecutionManagerBuilder {
    config: ExecutionManagerConfig,
    signer: Arc<dyn Signer>,
    peering: Arc<dyn PeeringDataFetcher>,
    executor_client: Arc<dyn ExecutorClient>,
    contract_callers: HashMap<ChainId, Arc<dyn ContractCaller>>,
    queue_capacity: usize,
}

impl fmt::Debug for ExecutionManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionManagerBuilder")
            .field("config", &self.config)
            .field("contract_callers", &self.contract_callers.keys().collect::<Vec<_>>())
            .field("queue_capacity", &self.queue_capacity)
            .finish_non_exhaustive()
    }
}

impl ExecutionManagerBuilder {
    pub fn new(
        config: ExecutionManagerConfig,
        signer: Arc<dyn Signer>,
        peering: Arc<dyn PeeringDataFetcher>,
        executor_client: Arc<dyn ExecutorClient>,
    ) -> Self {
        Self {
            config,
            signer,
            peering,
            executor_client,
            contract_callers: HashMap::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_contract_caller(mut self, chain_id: ChainId, caller: Arc<dyn ContractCaller>) -> Self {
        self.contract_callers.insert(chain_id, caller);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Loads the executor peer table and returns the handle plus the manager loop future.
    ///
    /// The loop runs until `cancel` fires; every session is cancelled with it.
    pub async fn init(
        self,
        cancel: CancellationToken,
    ) -> Result<(ExecutionManagerHandle, impl Future<Output = ()>)> {
        let avs_address = self.config.avs_address;
        let peers = self.peering.list_executor_operators(avs_address).await?;
        info!(%avs_address, peers = peers.len(), "loaded executor peers");

        let (event_tx, event_rx) = mpsc::channel(self.queue_capacity);
        let (task_tx, task_rx) = mpsc::channel(self.queue_capacity);
        let (results_tx, results_rx) = mpsc::channel(self.queue_capacity);
        let inflight = Arc::new(DashMap::new());
        let finalized = Arc::new(DashMap::new());

        let ctx = ExecutionManagerCtx {
            watched_contracts: self.config.watched_contracts(),
            config: self.config,
            signer: self.signer,
            executor_client: self.executor_client,
            contract_callers: self.contract_callers,
            inflight: inflight.clone(),
            finalized: finalized.clone(),
            task_tx,
            results_tx,
            cancel,
        };
        let state = ManagerState::new(peers);

        let handle = ExecutionManagerHandle {
            avs_address,
            event_tx,
            inflight,
            finalized,
        };
        let task = execution_manager_task(state, ctx, event_rx, task_rx, results_rx);
        Ok((handle, task))
    }
}
