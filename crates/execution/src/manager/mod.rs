//! Per-AVS event loop turning chain events into task sessions and certificates into
//! on-chain submissions.

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use alloy_primitives::Address;
use cohort_primitives::{core_contracts, ChainId, OperatorPeerInfo};

mod ctx;
mod events;
mod handle;
mod task;
#[cfg(test)]
mod test_utils;

pub use handle::{ExecutionManagerBuilder, ExecutionManagerHandle};

/// Capacity of the event, task and results queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// How long `handle_log` waits on a full event queue.
pub const EVENT_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub struct ExecutionManagerConfig {
    pub avs_address: Address,
    pub supported_chains: Vec<ChainId>,
    /// Task mailbox watched on each chain.
    pub mailbox_addresses: HashMap<ChainId, Address>,
    /// Operator address the aggregator signs task submissions as.
    pub aggregator_address: Address,
    /// Where executors send their results.
    pub aggregator_url: String,
    pub threshold_percentage: u8,
    /// Pause before submitting each certificate.
    pub write_delay: Duration,
}

impl ExecutionManagerConfig {
    /// Contracts whose events this manager reacts to: the mailboxes and the allocation
    /// managers of every supported chain.
    pub fn watched_contracts(&self) -> HashSet<Address> {
        let mailboxes = self
            .supported_chains
            .iter()
            .filter_map(|chain| self.mailbox_addresses.get(chain).copied());
        let allocation_managers = self
            .supported_chains
            .iter()
            .filter_map(|chain| core_contracts(*chain).and_then(|c| c.allocation_manager));
        mailboxes.chain(allocation_managers).collect()
    }
}

/// Executor peers known to the manager, keyed by operator address.
///
/// Owned by the manager loop; tasks only ever see cloned snapshots.
#[derive(Debug, Default)]
pub(crate) struct ManagerState {
    pub operator_peers: HashMap<Address, OperatorPeerInfo>,
}

impl ManagerState {
    pub(crate) fn new(peers: Vec<OperatorPeerInfo>) -> Self {
        Self {
            operator_peers: peers
                .into_iter()
                .map(|p| (p.operator_address, p))
                .collect(),
        }
    }
}
