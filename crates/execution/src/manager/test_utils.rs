use std::{collections::HashMap, sync::Arc, time::Duration};

use alloy_primitives::{Address, Bytes};
use cohort_crypto::InMemorySigner;
use cohort_primitives::{
    test_utils::{make_block, make_private_key},
    ChainEvent, ChainId, DecodedLog, LogWithBlock, Task, TaskCreatedEvent, TaskId,
};
use cohort_rpc_types::SubmitAck;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ctx::ExecutionManagerCtx, ExecutionManagerConfig};
use crate::{
    contract_caller::{ContractCaller, MockContractCaller},
    executor_client::MockExecutorClient,
    session::TaskSession,
    test_utils::avs,
};

pub(crate) fn manager_config(threshold_percentage: u8) -> ExecutionManagerConfig {
    ExecutionManagerConfig {
        avs_address: avs(),
        supported_chains: vec![ChainId::ETHEREUM_ANVIL],
        mailbox_addresses: HashMap::from([(ChainId::ETHEREUM_ANVIL, Address::repeat_byte(0xee))]),
        aggregator_address: Address::repeat_byte(0xa9),
        aggregator_url: "http://127.0.0.1:8080".to_string(),
        threshold_percentage,
        write_delay: Duration::ZERO,
    }
}

pub(crate) struct CtxParts {
    pub ctx: ExecutionManagerCtx,
    pub task_rx: mpsc::Receiver<Task>,
    pub _results_rx: mpsc::Receiver<Arc<TaskSession>>,
}

/// Context for the anvil chain with `caller` as its contract caller.
pub(crate) fn make_ctx(caller: MockContractCaller) -> CtxParts {
    let config = manager_config(100);
    let (task_tx, task_rx) = mpsc::channel(16);
    let (results_tx, results_rx) = mpsc::channel(16);
    let caller: Arc<dyn ContractCaller> = Arc::new(caller);

    let ctx = ExecutionManagerCtx {
        watched_contracts: config.watched_contracts(),
        config,
        signer: Arc::new(InMemorySigner::new(make_private_key(100))),
        executor_client: Arc::new(accepting_executor()),
        contract_callers: HashMap::from([(ChainId::ETHEREUM_ANVIL, caller)]),
        inflight: Arc::new(DashMap::new()),
        finalized: Arc::new(DashMap::new()),
        task_tx,
        results_tx,
        cancel: CancellationToken::new(),
    };
    CtxParts {
        ctx,
        task_rx,
        _results_rx: results_rx,
    }
}

/// Executor client that accepts every submission.
pub(crate) fn accepting_executor() -> MockExecutorClient {
    let mut client = MockExecutorClient::new();
    client
        .expect_submit_task()
        .returning(|_, _| Ok(SubmitAck::accepted()));
    client
}

/// Mailbox log on anvil creating `task_id` for operator set 1.
pub(crate) fn task_created_log(task_id: TaskId, deadline_unix_seconds: u64) -> LogWithBlock {
    LogWithBlock {
        log: DecodedLog {
            address: Address::repeat_byte(0xee),
            log_index: Some(0),
            transaction_hash: None,
            event: ChainEvent::TaskCreated(TaskCreatedEvent {
                creator: Address::repeat_byte(0xcc),
                task_id,
                avs: avs(),
                executor_operator_set_id: 1,
                refund_collector: Address::ZERO,
                avs_fee: 0,
                task_deadline: deadline_unix_seconds,
                payload: Bytes::from_static(b"payload"),
            }),
        },
        block: make_block(ChainId::ETHEREUM_ANVIL, 10),
    }
}
