use std::{future::Future, sync::Arc, time::Duration};

use alloy_primitives::Address;
use cohort_primitives::{ChainId, LogWithBlock};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::{ctx::EvmPollerCtx, task::evm_poller_task};
use crate::{client::ChainClient, DEFAULT_POLL_INTERVAL, POLLER_ENQUEUE_TIMEOUT};

/// Handle for observing a running EVM poller.
#[derive(Debug)]
pub struct EvmChainPollerHandle {
    chain_id: ChainId,
    last_observed_rx: watch::Receiver<Option<u64>>,
}

impl EvmChainPollerHandle {
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Highest block whose events have all been handed off, if any.
    pub fn last_observed_block(&self) -> Option<u64> {
        *self.last_observed_rx.borrow()
    }

    /// Returns a watcher for last observed block updates.
    pub fn last_observed_watcher(&self) -> watch::Receiver<Option<u64>> {
        self.last_observed_rx.clone()
    }
}

/// Builder for an EVM chain poller.
#[derive(Debug)]
pub struct EvmChainPollerBuilder<C> {
    chain_id: ChainId,
    client: Arc<C>,
    contracts: Vec<Address>,
    event_tx: mpsc::Sender<LogWithBlock>,
    poll_interval: Option<Duration>,
    enqueue_timeout: Option<Duration>,
    start_block: Option<u64>,
}

impl<C> EvmChainPollerBuilder<C> {
    pub fn new(
        chain_id: ChainId,
        client: Arc<C>,
        contracts: Vec<Address>,
        event_tx: mpsc::Sender<LogWithBlock>,
    ) -> Self {
        Self {
            chain_id,
            client,
            contracts,
            event_tx,
            poll_interval: None,
            enqueue_timeout: None,
            start_block: None,
        }
    }

    /// Sets the time between ticks.
    pub fn with_poll_interval(mut self, v: Duration) -> Self {
        self.poll_interval = Some(v);
        self
    }

    /// Sets how long a tick waits on a full event queue before dropping the event.
    pub fn with_enqueue_timeout(mut self, v: Duration) -> Self {
        self.enqueue_timeout = Some(v);
        self
    }

    /// Treats `v` as already observed so polling resumes at `v + 1`.
    pub fn with_last_observed_block(mut self, v: u64) -> Self {
        self.start_block = Some(v);
        self
    }

    /// Builds and returns the poller handle and task.
    ///
    /// The task runs until `cancel` fires or the event queue is closed.
    pub fn build(self, cancel: CancellationToken) -> (EvmChainPollerHandle, impl Future<Output = ()>)
    where
        C: ChainClient,
    {
        let (last_observed_tx, last_observed_rx) = watch::channel(self.start_block);
        let handle = EvmChainPollerHandle {
            chain_id: self.chain_id,
            last_observed_rx,
        };
        let ctx = EvmPollerCtx {
            chain_id: self.chain_id,
            client: self.client,
            contracts: self.contracts,
            event_tx: self.event_tx,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            enqueue_timeout: self.enqueue_timeout.unwrap_or(POLLER_ENQUEUE_TIMEOUT),
            last_observed_tx,
        };
        let task = evm_poller_task(self.start_block, ctx, cancel);

        (handle, task)
    }
}
