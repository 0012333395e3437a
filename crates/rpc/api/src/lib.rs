//! JSON-RPC API definitions.

use cohort_rpc_types::{RpcLogWithBlock, RpcTaskResult, RpcTaskSubmission, SubmitAck};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};

/// Methods the aggregator serves to executor operators.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "aggregator"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "aggregator"))]
pub trait AggregatorApi {
    /// Submit a signed task result. Routed to the execution manager of the result's AVS.
    #[method(name = "submitTaskResult")]
    async fn submit_task_result(&self, result: RpcTaskResult) -> RpcResult<SubmitAck>;
}

/// Methods executor operators serve to the aggregator.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "executor"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "executor"))]
pub trait ExecutorApi {
    /// Hand a task to the operator for execution.
    #[method(name = "submitTask")]
    async fn submit_task(&self, task: RpcTaskSubmission) -> RpcResult<SubmitAck>;
}

/// Manual event injection for chains without a live RPC.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "poller"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "poller"))]
pub trait ManualPollerApi {
    /// Decode the log and enqueue it as if it had been observed on-chain.
    #[method(name = "pushEvent")]
    async fn push_event(&self, event: RpcLogWithBlock) -> RpcResult<SubmitAck>;
}
