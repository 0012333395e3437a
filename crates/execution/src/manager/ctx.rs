use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use alloy_primitives::Address;
use cohort_crypto::Signer;
use cohort_primitives::{ChainId, Task, TaskId};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::ExecutionManagerConfig;
use crate::{
    contract_caller::ContractCaller,
    executor_client::ExecutorClient,
    session::{SessionParams, TaskSession},
};

pub(crate) struct ExecutionManagerCtx {
    pub config: ExecutionManagerConfig,
    pub watched_contracts: HashSet<Address>,
    pub signer: Arc<dyn Signer>,
    pub executor_client: Arc<dyn ExecutorClient>,
    pub contract_callers: HashMap<ChainId, Arc<dyn ContractCaller>>,
    pub inflight: Arc<DashMap<TaskId, Arc<TaskSession>>>,
    /// Finalized task ids mapped to their deadline, kept until the deadline passes.
    pub finalized: Arc<DashMap<TaskId, u64>>,
    pub task_tx: mpsc::Sender<Task>,
    pub results_tx: mpsc::Sender<Arc<TaskSession>>,
    pub cancel: CancellationToken,
}

impl ExecutionManagerCtx {
    pub(crate) fn session_params(&self) -> SessionParams {
        SessionParams {
            aggregator_address: self.config.aggregator_address,
            aggregator_url: self.config.aggregator_url.clone(),
            threshold_percentage: self.config.threshold_percentage,
        }
    }

    pub(crate) fn contract_caller(&self, chain_id: ChainId) -> Option<Arc<dyn ContractCaller>> {
        self.contract_callers.get(&chain_id).cloned()
    }
}
