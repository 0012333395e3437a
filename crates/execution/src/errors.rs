use alloy_primitives::Address;
use cohort_aggregation::AggregationError;
use cohort_primitives::{ChainId, TaskId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeeringError {
    #[error("peering data unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ExecutorClientError {
    #[error("failed to connect to executor at {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("executor rpc failed: {0}")]
    Rpc(String),
}

#[derive(Debug, Error)]
pub enum ContractCallerError {
    #[error("chain rpc failed: {0}")]
    Rpc(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("task {0} is already being processed")]
    TaskAlreadyInFlight(TaskId),

    #[error("task {task_id} expired at {deadline}")]
    TaskExpired { task_id: TaskId, deadline: u64 },

    #[error("failed to create task session: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("{0} queue full")]
    QueueFull(&'static str),

    #[error("execution manager stopped")]
    ManagerStopped,

    #[error("peer not found for deregistration: {0}")]
    UnknownPeer(Address),

    #[error("no contract caller for chain {0}")]
    MissingContractCaller(ChainId),

    #[error("task {0} finalized without a certificate")]
    MissingCertificate(TaskId),

    #[error("contract call: {0}")]
    ContractCaller(#[from] ContractCallerError),

    #[error("peering: {0}")]
    Peering(#[from] PeeringError),
}

impl ExecutionError {
    /// Whether the task this error belongs to can no longer produce a certificate on chain.
    pub fn is_fatal_to_task(&self) -> bool {
        match self {
            ExecutionError::TaskExpired { .. }
            | ExecutionError::Aggregation(_)
            | ExecutionError::MissingContractCaller(_)
            | ExecutionError::MissingCertificate(_)
            | ExecutionError::ContractCaller(_) => true,
            ExecutionError::TaskAlreadyInFlight(_)
            | ExecutionError::QueueFull(_)
            | ExecutionError::ManagerStopped
            | ExecutionError::UnknownPeer(_)
            | ExecutionError::Peering(_) => false,
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, ExecutionError>;
