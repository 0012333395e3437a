use alloy_primitives::{Address, Bytes, B256};
use cohort_crypto::PrivateKey;
use cohort_primitives::{
    output_digest,
    test_utils::{make_peer, make_private_key},
    OperatorPeerInfo, TaskId, TaskResult,
};

use crate::TaskResultAggregator;

pub(crate) fn task_id() -> TaskId {
    TaskId::new(B256::repeat_byte(0x5a))
}

/// `n` operators in set 1 with their signing keys, index-aligned.
pub(crate) fn make_operators(n: u64) -> (Vec<PrivateKey>, Vec<OperatorPeerInfo>) {
    let keys = (0..n).map(make_private_key).collect();
    let peers = (0..n).map(|i| make_peer(i, &[1])).collect();
    (keys, peers)
}

pub(crate) fn make_aggregator(
    operators: Vec<OperatorPeerInfo>,
    threshold_percentage: u8,
) -> TaskResultAggregator {
    TaskResultAggregator::new(
        task_id(),
        100,
        1,
        threshold_percentage,
        Bytes::from_static(b"payload"),
        u64::MAX,
        operators,
    )
    .unwrap()
}

/// Result for `operator` carrying a signature made with `key` over `keccak256(output)`.
pub(crate) fn signed_result(
    key: &PrivateKey,
    operator: &OperatorPeerInfo,
    output: &[u8],
) -> TaskResult {
    let signature = key.sign(output_digest(output).as_slice());
    TaskResult {
        task_id: task_id(),
        avs_address: Address::repeat_byte(0x0a),
        operator_address: operator.operator_address,
        output: Bytes::copy_from_slice(output),
        signature: Bytes::from(signature.to_bytes().unwrap()),
    }
}
