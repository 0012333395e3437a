//! Wire types for the aggregator, executor and manual poller RPC surfaces.

use alloy_primitives::{Address, Bytes};
use cohort_primitives::{EthBlock, TaskId, TaskResult};
use serde::{Deserialize, Serialize};

/// Task pushed from the aggregator to an executor operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTaskSubmission {
    pub task_id: TaskId,
    pub avs_address: Address,
    pub aggregator_address: Address,
    pub payload: Bytes,
    /// Where the executor should send its result.
    pub aggregator_url: String,
    /// Aggregator's BLS signature over `payload`.
    pub signature: Bytes,
}

/// Result pushed from an executor operator back to the aggregator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTaskResult {
    pub task_id: TaskId,
    pub avs_address: Address,
    pub operator_address: Address,
    pub output: Bytes,
    pub signature: Bytes,
}

impl From<RpcTaskResult> for TaskResult {
    fn from(value: RpcTaskResult) -> Self {
        TaskResult {
            task_id: value.task_id,
            avs_address: value.avs_address,
            operator_address: value.operator_address,
            output: value.output,
            signature: value.signature,
        }
    }
}

impl From<TaskResult> for RpcTaskResult {
    fn from(value: TaskResult) -> Self {
        RpcTaskResult {
            task_id: value.task_id,
            avs_address: value.avs_address,
            operator_address: value.operator_address,
            output: value.output,
            signature: value.signature,
        }
    }
}

/// A raw log and the block it was included in, pushed by hand into a manual poller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLogWithBlock {
    pub log: alloy_rpc_types_eth::Log,
    pub block: EthBlock,
}

/// Acknowledgement shared by every submission method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SubmitAck {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;

    #[test]
    fn test_task_result_wire_shape() {
        let result = RpcTaskResult {
            task_id: TaskId::new(B256::repeat_byte(1)),
            avs_address: Address::repeat_byte(2),
            operator_address: Address::repeat_byte(3),
            output: Bytes::from_static(b"\x01\x02"),
            signature: Bytes::new(),
        };
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["output"], "0x0102");
        assert!(json.get("operatorAddress").is_some());
        assert!(json.get("taskId").is_some());

        let domain: TaskResult = result.clone().into();
        assert_eq!(RpcTaskResult::from(domain), result);
    }

    #[test]
    fn test_ack_omits_empty_message() {
        let json = serde_json::to_string(&SubmitAck::accepted()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let rejected = SubmitAck::rejected("no such avs");
        assert_eq!(rejected.message.as_deref(), Some("no such avs"));
        assert!(!rejected.success);
    }
}
