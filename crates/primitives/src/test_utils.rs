//! Builders for fixtures used across the workspace's tests.

use alloy_primitives::{aliases::U96, Address, Bytes, Log, B256, U256};
use alloy_sol_types::SolEvent;
use cohort_crypto::PrivateKey;

use crate::{events::abi, ChainId, EthBlock, OperatorPeerInfo, OperatorSetId, TaskId};

/// Deterministic non-zero key derived from `seed`.
pub fn make_private_key(seed: u64) -> PrivateKey {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&(seed + 1).to_be_bytes());
    PrivateKey::from_bytes(&bytes).expect("non-zero seed scalar")
}

/// Operator address derived from `seed`.
pub fn make_operator_address(seed: u64) -> Address {
    let mut bytes = [0u8; 20];
    bytes[12..].copy_from_slice(&(seed + 1).to_be_bytes());
    Address::from(bytes)
}

/// Peer whose key is `make_private_key(seed)`.
pub fn make_peer(seed: u64, operator_set_ids: &[OperatorSetId]) -> OperatorPeerInfo {
    OperatorPeerInfo {
        operator_address: make_operator_address(seed),
        network_address: format!("127.0.0.1:{}", 9000 + seed),
        public_key: make_private_key(seed).public_key(),
        operator_set_ids: operator_set_ids.to_vec(),
    }
}

pub fn make_block(chain_id: ChainId, number: u64) -> EthBlock {
    EthBlock {
        chain_id,
        number,
        hash: B256::from(U256::from(number)),
        parent_hash: B256::from(U256::from(number.saturating_sub(1))),
        timestamp: 1_700_000_000 + number * 12,
    }
}

pub fn raw_task_created_log(
    mailbox: Address,
    task_id: TaskId,
    avs: Address,
    operator_set_id: OperatorSetId,
    deadline: u64,
    payload: &[u8],
) -> Log {
    let event = abi::TaskCreated {
        creator: Address::repeat_byte(0xcc),
        taskHash: *task_id.as_b256(),
        avs,
        executorOperatorSetId: operator_set_id,
        refundCollector: Address::repeat_byte(0xcc),
        avsFee: U96::ZERO,
        taskDeadline: U256::from(deadline),
        payload: Bytes::copy_from_slice(payload),
    };
    Log {
        address: mailbox,
        data: event.encode_log_data(),
    }
}

pub fn raw_operator_added_log(
    allocation_manager: Address,
    operator: Address,
    avs: Address,
    operator_set_id: OperatorSetId,
) -> Log {
    let event = abi::OperatorAddedToOperatorSet {
        operator,
        operatorSet: abi::OperatorSet {
            avs,
            id: operator_set_id,
        },
    };
    Log {
        address: allocation_manager,
        data: event.encode_log_data(),
    }
}

pub fn raw_operator_removed_log(
    allocation_manager: Address,
    operator: Address,
    avs: Address,
    operator_set_id: OperatorSetId,
) -> Log {
    let event = abi::OperatorRemovedFromOperatorSet {
        operator,
        operatorSet: abi::OperatorSet {
            avs,
            id: operator_set_id,
        },
    };
    Log {
        address: allocation_manager,
        data: event.encode_log_data(),
    }
}
