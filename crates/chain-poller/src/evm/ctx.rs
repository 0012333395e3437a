use std::{sync::Arc, time::Duration};

use alloy_primitives::Address;
use cohort_primitives::{ChainId, LogWithBlock};
use tokio::sync::{mpsc, watch};

pub(crate) struct EvmPollerCtx<C> {
    pub chain_id: ChainId,
    pub client: Arc<C>,
    pub contracts: Vec<Address>,
    pub event_tx: mpsc::Sender<LogWithBlock>,
    pub poll_interval: Duration,
    pub enqueue_timeout: Duration,
    pub last_observed_tx: watch::Sender<Option<u64>>,
}

impl<C> EvmPollerCtx<C> {
    /// Notify watchers that every event up to `block` has been handed off.
    pub(crate) fn notify_observed(&self, block: u64) {
        let _ = self.last_observed_tx.send(Some(block));
    }
}
