use alloy_primitives::Log;

/// Wraps a raw log the way `eth_getLogs` would return it.
pub(crate) fn rpc_log(inner: Log, block_number: u64, log_index: u64) -> alloy_rpc_types_eth::Log {
    alloy_rpc_types_eth::Log {
        inner,
        block_hash: None,
        block_number: Some(block_number),
        block_timestamp: None,
        transaction_hash: None,
        transaction_index: None,
        log_index: Some(log_index),
        removed: false,
    }
}
