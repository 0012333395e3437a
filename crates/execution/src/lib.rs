//! Task execution for one AVS: broadcasting tasks to executors, collecting their signed
//! results and submitting the resulting certificates.
//!
//! The [`ExecutionManagerBuilder`] wires an event loop that owns the executor peer table and
//! spawns one [`TaskSession`] per task. Executor results reach a session through the
//! [`ExecutionManagerHandle`].

mod contract_caller;
mod errors;
mod executor_client;
mod manager;
mod peering;
mod session;
#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(any(test, feature = "test-utils"))]
pub use contract_caller::MockContractCaller;
pub use contract_caller::{
    ContractCaller, SimulatedContractCaller, TxReceipt, DEFAULT_SUBMISSION_HISTORY,
};
pub use errors::{ContractCallerError, ExecutionError, ExecutorClientError, PeeringError};
#[cfg(any(test, feature = "test-utils"))]
pub use executor_client::MockExecutorClient;
pub use executor_client::{ExecutorClient, RpcExecutorClient, DEFAULT_EXECUTOR_REQUEST_TIMEOUT};
pub use manager::{
    ExecutionManagerBuilder, ExecutionManagerConfig, ExecutionManagerHandle,
    DEFAULT_QUEUE_CAPACITY, EVENT_ENQUEUE_TIMEOUT,
};
#[cfg(any(test, feature = "test-utils"))]
pub use peering::MockPeeringDataFetcher;
pub use peering::{LocalPeeringDataFetcher, PeeringDataFetcher};
pub use session::{BroadcastSummary, RecordOutcome, SessionOutcome, SessionParams, TaskSession};
