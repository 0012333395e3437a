use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, Bytes, B256};
use cohort_aggregation::{AggregatedCertificate, TaskResultAggregator};
use cohort_primitives::{
    output_digest,
    test_utils::{make_peer, make_private_key},
    ChainId, Task, TaskId, TaskResult,
};

use crate::session::SessionParams;

pub(crate) fn avs() -> Address {
    Address::repeat_byte(0x0a)
}

pub(crate) fn task_id() -> TaskId {
    TaskId::new(B256::repeat_byte(0x7a))
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Task in operator set 1 addressed to peers `0..recipients`.
pub(crate) fn make_task(recipients: u64, deadline_unix_seconds: u64) -> Task {
    Task {
        task_id: task_id(),
        avs_address: avs(),
        operator_set_id: 1,
        mailbox_address: Address::repeat_byte(0xee),
        recipient_operators: (0..recipients).map(|i| make_peer(i, &[1])).collect(),
        deadline_unix_seconds,
        payload: Bytes::from_static(b"payload"),
        chain_id: ChainId::ETHEREUM_ANVIL,
        block_number: 10,
        block_hash: B256::repeat_byte(0x10),
    }
}

pub(crate) fn session_params(threshold_percentage: u8) -> SessionParams {
    SessionParams {
        aggregator_address: Address::repeat_byte(0xa9),
        aggregator_url: "http://127.0.0.1:8080".to_string(),
        threshold_percentage,
    }
}

/// Result from peer `seed` for [`task_id`], correctly signed.
pub(crate) fn signed_result(seed: u64, output: &[u8]) -> TaskResult {
    signed_result_for(task_id(), seed, output)
}

pub(crate) fn signed_result_for(task_id: TaskId, seed: u64, output: &[u8]) -> TaskResult {
    let signature = make_private_key(seed).sign(output_digest(output).as_slice());
    TaskResult {
        task_id,
        avs_address: avs(),
        operator_address: make_peer(seed, &[1]).operator_address,
        output: Bytes::copy_from_slice(output),
        signature: Bytes::from(signature.to_bytes().unwrap()),
    }
}

/// Certificate signed by every one of `operators` peers.
pub(crate) fn make_certificate(operators: u64) -> AggregatedCertificate {
    let task = make_task(operators, u64::MAX);
    let aggregator = TaskResultAggregator::new(
        task.task_id,
        task.block_number,
        task.operator_set_id,
        100,
        task.payload.clone(),
        task.deadline_unix_seconds,
        task.recipient_operators.clone(),
    )
    .unwrap();
    for seed in 0..operators {
        aggregator
            .process_new_signature(&signed_result(seed, b"output"))
            .unwrap();
    }
    aggregator.generate_final_certificate().unwrap()
}
