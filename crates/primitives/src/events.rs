//! Typed chain events and the log decoder.

use alloy_primitives::{Address, Bytes, Log, B256};
use alloy_sol_types::SolEvent;
use thiserror::Error;

use crate::{EthBlock, OperatorSetId, TaskId};

pub(crate) mod abi {
    use alloy_sol_types::sol;

    sol! {
        /// Operator set as emitted by the allocation manager.
        #[derive(Debug, PartialEq, Eq)]
        struct OperatorSet {
            address avs;
            uint32 id;
        }

        #[derive(Debug, PartialEq, Eq)]
        event OperatorAddedToOperatorSet(address indexed operator, OperatorSet operatorSet);

        #[derive(Debug, PartialEq, Eq)]
        event OperatorRemovedFromOperatorSet(address indexed operator, OperatorSet operatorSet);

        #[derive(Debug, PartialEq, Eq)]
        event TaskCreated(
            address indexed creator,
            bytes32 indexed taskHash,
            address indexed avs,
            uint32 executorOperatorSetId,
            address refundCollector,
            uint96 avsFee,
            /// Absolute expiry, unix seconds.
            uint256 taskDeadline,
            bytes payload
        );
    }
}

/// A task posted to the mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskCreatedEvent {
    pub creator: Address,
    pub task_id: TaskId,
    pub avs: Address,
    pub executor_operator_set_id: OperatorSetId,
    pub refund_collector: Address,
    pub avs_fee: u128,
    pub task_deadline: u64,
    pub payload: Bytes,
}

/// An operator joining or leaving an operator set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorSetMembershipEvent {
    pub operator: Address,
    pub avs: Address,
    pub operator_set_id: OperatorSetId,
}

/// Every event the aggregator reacts to, plus a fallback for everything else emitted by the
/// watched contracts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    TaskCreated(TaskCreatedEvent),
    OperatorAddedToOperatorSet(OperatorSetMembershipEvent),
    OperatorRemovedFromOperatorSet(OperatorSetMembershipEvent),
    Unrecognized { topic0: Option<B256> },
}

impl ChainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChainEvent::TaskCreated(_) => "TaskCreated",
            ChainEvent::OperatorAddedToOperatorSet(_) => "OperatorAddedToOperatorSet",
            ChainEvent::OperatorRemovedFromOperatorSet(_) => "OperatorRemovedFromOperatorSet",
            ChainEvent::Unrecognized { .. } => "Unrecognized",
        }
    }

    /// Decodes a raw log. Logs whose first topic matches no known event come back as
    /// [`ChainEvent::Unrecognized`]; a known topic with an undecodable body is an error.
    pub fn decode(log: &Log) -> Result<Self, DecodeError> {
        let Some(topic0) = log.data.topics().first().copied() else {
            return Ok(ChainEvent::Unrecognized { topic0: None });
        };

        if topic0 == abi::TaskCreated::SIGNATURE_HASH {
            let ev = abi::TaskCreated::decode_log(log)
                .map_err(|e| DecodeError::malformed("TaskCreated", e))?
                .data;
            return Ok(ChainEvent::TaskCreated(TaskCreatedEvent {
                creator: ev.creator,
                task_id: TaskId::new(ev.taskHash),
                avs: ev.avs,
                executor_operator_set_id: ev.executorOperatorSetId,
                refund_collector: ev.refundCollector,
                avs_fee: ev.avsFee.saturating_to::<u128>(),
                task_deadline: ev.taskDeadline.saturating_to::<u64>(),
                payload: ev.payload,
            }));
        }

        if topic0 == abi::OperatorAddedToOperatorSet::SIGNATURE_HASH {
            let ev = abi::OperatorAddedToOperatorSet::decode_log(log)
                .map_err(|e| DecodeError::malformed("OperatorAddedToOperatorSet", e))?
                .data;
            return Ok(ChainEvent::OperatorAddedToOperatorSet(
                OperatorSetMembershipEvent {
                    operator: ev.operator,
                    avs: ev.operatorSet.avs,
                    operator_set_id: ev.operatorSet.id,
                },
            ));
        }

        if topic0 == abi::OperatorRemovedFromOperatorSet::SIGNATURE_HASH {
            let ev = abi::OperatorRemovedFromOperatorSet::decode_log(log)
                .map_err(|e| DecodeError::malformed("OperatorRemovedFromOperatorSet", e))?
                .data;
            return Ok(ChainEvent::OperatorRemovedFromOperatorSet(
                OperatorSetMembershipEvent {
                    operator: ev.operator,
                    avs: ev.operatorSet.avs,
                    operator_set_id: ev.operatorSet.id,
                },
            ));
        }

        Ok(ChainEvent::Unrecognized {
            topic0: Some(topic0),
        })
    }
}

/// A decoded log with its provenance inside the block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedLog {
    /// Emitting contract.
    pub address: Address,
    pub log_index: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub event: ChainEvent,
}

impl DecodedLog {
    pub fn from_raw(
        log: &Log,
        log_index: Option<u64>,
        transaction_hash: Option<B256>,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            address: log.address,
            log_index,
            transaction_hash,
            event: ChainEvent::decode(log)?,
        })
    }

    /// Decodes a log as returned by `eth_getLogs`.
    pub fn from_rpc(log: &alloy_rpc_types_eth::Log) -> Result<Self, DecodeError> {
        Self::from_raw(&log.inner, log.log_index, log.transaction_hash)
    }
}

/// Unit of work flowing from pollers to execution managers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogWithBlock {
    pub log: DecodedLog,
    pub block: EthBlock,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed {event} log: {reason}")]
    Malformed { event: &'static str, reason: String },
}

impl DecodeError {
    fn malformed(event: &'static str, err: alloy_sol_types::Error) -> Self {
        Self::Malformed {
            event,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{LogData, U256};

    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_decode_task_created() {
        let task_id = TaskId::new(B256::repeat_byte(0xaa));
        let avs = Address::repeat_byte(0x0a);
        let log = raw_task_created_log(Address::repeat_byte(0xee), task_id, avs, 3, 1_700_000_000, b"hi");

        let event = ChainEvent::decode(&log).unwrap();
        let ChainEvent::TaskCreated(ev) = event else {
            panic!("expected TaskCreated, got {event:?}");
        };
        assert_eq!(ev.task_id, task_id);
        assert_eq!(ev.avs, avs);
        assert_eq!(ev.executor_operator_set_id, 3);
        assert_eq!(ev.task_deadline, 1_700_000_000);
        assert_eq!(ev.payload.as_ref(), b"hi");
    }

    #[test]
    fn test_decode_membership_events() {
        let operator = Address::repeat_byte(0x01);
        let avs = Address::repeat_byte(0x0a);

        let added = raw_operator_added_log(Address::ZERO, operator, avs, 5);
        assert_eq!(
            ChainEvent::decode(&added).unwrap(),
            ChainEvent::OperatorAddedToOperatorSet(OperatorSetMembershipEvent {
                operator,
                avs,
                operator_set_id: 5
            })
        );

        let removed = raw_operator_removed_log(Address::ZERO, operator, avs, 5);
        assert!(matches!(
            ChainEvent::decode(&removed).unwrap(),
            ChainEvent::OperatorRemovedFromOperatorSet(_)
        ));
    }

    #[test]
    fn test_unknown_topic_is_unrecognized() {
        let topic = B256::repeat_byte(0x42);
        let log = Log {
            address: Address::ZERO,
            data: LogData::new_unchecked(vec![topic], Bytes::new()),
        };
        assert_eq!(
            ChainEvent::decode(&log).unwrap(),
            ChainEvent::Unrecognized {
                topic0: Some(topic)
            }
        );

        let anonymous = Log {
            address: Address::ZERO,
            data: LogData::new_unchecked(vec![], Bytes::new()),
        };
        assert_eq!(
            ChainEvent::decode(&anonymous).unwrap(),
            ChainEvent::Unrecognized { topic0: None }
        );
    }

    #[test]
    fn test_known_topic_with_bad_body_is_error() {
        // Scenario: topic0 says TaskCreated but the indexed topics and data are missing
        // Expected: decode error rather than a silently ignored log
        let log = Log {
            address: Address::ZERO,
            data: LogData::new_unchecked(
                vec![abi::TaskCreated::SIGNATURE_HASH],
                Bytes::from(U256::from(1).to_be_bytes_vec()),
            ),
        };
        assert!(matches!(
            ChainEvent::decode(&log),
            Err(DecodeError::Malformed {
                event: "TaskCreated",
                ..
            })
        ));
    }
}
