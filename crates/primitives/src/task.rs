//! Tasks and operator results.

use alloy_primitives::{keccak256, Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::{ChainId, EthBlock, OperatorPeerInfo, OperatorSetId, TaskCreatedEvent, TaskId};

/// A unit of work distributed to an operator set.
///
/// `recipient_operators` is an owned snapshot of the peer table at creation time; it never
/// aliases the live table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub avs_address: Address,
    pub operator_set_id: OperatorSetId,
    /// Mailbox contract that emitted the task.
    pub mailbox_address: Address,
    pub recipient_operators: Vec<OperatorPeerInfo>,
    /// Absolute expiry, unix seconds.
    pub deadline_unix_seconds: u64,
    pub payload: Bytes,
    pub chain_id: ChainId,
    pub block_number: u64,
    pub block_hash: B256,
}

impl Task {
    /// Builds a task from a mailbox event with an empty recipient list.
    pub fn from_event(event: &TaskCreatedEvent, mailbox_address: Address, block: &EthBlock) -> Self {
        Self {
            task_id: event.task_id,
            avs_address: event.avs,
            operator_set_id: event.executor_operator_set_id,
            mailbox_address,
            recipient_operators: Vec::new(),
            deadline_unix_seconds: event.task_deadline,
            payload: event.payload.clone(),
            chain_id: block.chain_id,
            block_number: block.number,
            block_hash: block.hash,
        }
    }

    /// Attaches deep copies of the peers that belong to this task's operator set.
    pub fn with_recipients<'a>(mut self, peers: impl IntoIterator<Item = &'a OperatorPeerInfo>) -> Self {
        self.recipient_operators = peers
            .into_iter()
            .filter(|peer| peer.is_member_of(self.operator_set_id))
            .cloned()
            .collect();
        self
    }

    pub fn is_expired(&self, now_unix_seconds: u64) -> bool {
        now_unix_seconds >= self.deadline_unix_seconds
    }
}

/// One operator's signed answer to a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub avs_address: Address,
    pub operator_address: Address,
    pub output: Bytes,
    /// Compressed BLS signature over `keccak256(output)`, as received.
    pub signature: Bytes,
}

impl TaskResult {
    pub fn digest(&self) -> B256 {
        output_digest(&self.output)
    }
}

/// Digest operators sign over for a given output.
pub fn output_digest(output: &[u8]) -> B256 {
    keccak256(output)
}
