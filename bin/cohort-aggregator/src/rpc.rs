//! Aggregator RPC server receiving executor results.

use std::{collections::HashMap, net::SocketAddr};

use alloy_primitives::Address;
use cohort_execution::{ExecutionManagerHandle, RecordOutcome};
use cohort_primitives::TaskResult;
use cohort_rpc_api::AggregatorApiServer;
use cohort_rpc_types::{RpcTaskResult, SubmitAck};
use jsonrpsee::{
    core::{async_trait, RpcResult},
    server::{ServerBuilder, ServerHandle},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::InitError;

/// Routes executor results to the execution manager of their AVS.
#[derive(Clone, Debug)]
pub(crate) struct AggregatorRpc {
    managers: HashMap<Address, ExecutionManagerHandle>,
}

impl AggregatorRpc {
    pub(crate) fn new(managers: impl IntoIterator<Item = ExecutionManagerHandle>) -> Self {
        Self {
            managers: managers
                .into_iter()
                .map(|handle| (handle.avs_address(), handle))
                .collect(),
        }
    }

    fn route(&self, result: &TaskResult) -> SubmitAck {
        let Some(manager) = self.managers.get(&result.avs_address) else {
            return SubmitAck::rejected(format!("avs {} is not served here", result.avs_address));
        };

        match manager.handle_task_result_from_executor(result) {
            RecordOutcome::Recorded => SubmitAck::accepted(),
            RecordOutcome::Finalized => {
                info!(task_id = %result.task_id, avs = %result.avs_address, "task reached threshold");
                SubmitAck::accepted()
            }
            RecordOutcome::AlreadyFinalized => SubmitAck {
                success: true,
                message: Some("task already finalized".to_string()),
            },
            RecordOutcome::Rejected(err) => SubmitAck::rejected(err.to_string()),
            RecordOutcome::UnknownTask => {
                SubmitAck::rejected(format!("task {} is not in flight", result.task_id))
            }
        }
    }
}

#[async_trait]
impl AggregatorApiServer for AggregatorRpc {
    async fn submit_task_result(&self, result: RpcTaskResult) -> RpcResult<SubmitAck> {
        let result = TaskResult::from(result);
        let ack = self.route(&result);
        if ack.success {
            debug!(task_id = %result.task_id, operator = %result.operator_address, "accepted task result");
        } else {
            warn!(
                task_id = %result.task_id,
                operator = %result.operator_address,
                reason = ack.message.as_deref().unwrap_or_default(),
                "rejected task result"
            );
        }
        Ok(ack)
    }
}

/// Serves the aggregator API on `addr` until `cancel` fires. Returns the bound address.
pub(crate) async fn serve(
    rpc: AggregatorRpc,
    addr: SocketAddr,
    cancel: CancellationToken,
) -> Result<(SocketAddr, ServerHandle), InitError> {
    let server = ServerBuilder::default()
        .build(addr)
        .await
        .map_err(|e| InitError::Server(format!("failed to bind {addr}: {e}")))?;
    let local_addr = server
        .local_addr()
        .map_err(|e| InitError::Server(e.to_string()))?;

    let handle = server.start(rpc.into_rpc());
    info!(%local_addr, "aggregator rpc listening");

    let stop_handle = handle.clone();
    tokio::spawn(async move {
        cancel.cancelled().await;
        info!("stopping aggregator rpc");
        let _ = stop_handle.stop();
    });

    Ok((local_addr, handle))
}
