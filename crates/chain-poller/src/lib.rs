//! Chain pollers turning raw block and log data into ordered chain events.
//!
//! Three variants feed the same event queue: [`EvmChainPollerBuilder`] follows a live node,
//! [`ManualPushPoller`] accepts events pushed over JSON-RPC and [`SimulatedPoller`] adds a
//! periodic synthetic task on top of the manual poller.

use std::time::Duration;

mod client;
mod contracts;
mod errors;
mod evm;
mod manual;
mod simulated;
#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(any(test, feature = "test-utils"))]
pub use client::MockChainClient;
pub use client::{ChainClient, LogFilter, RpcChainClient};
pub use contracts::interesting_contracts;
pub use errors::{ChainClientError, PollerError};
pub use evm::{EvmChainPollerBuilder, EvmChainPollerHandle};
pub use manual::ManualPushPoller;
pub use simulated::{SimulatedPoller, SimulatedTaskConfig};

/// Default time between EVM poller ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How long the EVM poller waits on a full event queue before dropping an event.
pub const POLLER_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(100);

/// How long pushed and synthetic events wait on a full event queue.
pub const MANUAL_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(1);
