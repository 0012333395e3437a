use std::io;

use cohort_chain_poller::{ChainClientError, PollerError};
use cohort_common::logging::LoggingError;
use cohort_config::ConfigError;
use cohort_execution::ExecutionError;
use cohort_primitives::ChainId;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum InitError {
    #[error("failed to build runtime: {0}")]
    RuntimeBuild(#[source] io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("chain client: {0}")]
    ChainClient(#[from] ChainClientError),

    #[error("poller: {0}")]
    Poller(#[from] PollerError),

    #[error("execution manager: {0}")]
    Execution(#[from] ExecutionError),

    #[error("no task mailbox known for chain {0}")]
    MissingMailbox(ChainId),

    #[error("rpc server: {0}")]
    Server(String),
}
