//! Poller that follows a live EVM chain over JSON-RPC.

mod ctx;
mod handle;
mod task;

pub use handle::{EvmChainPollerBuilder, EvmChainPollerHandle};
