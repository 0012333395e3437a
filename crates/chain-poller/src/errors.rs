use thiserror::Error;

/// Errors talking to a chain's JSON-RPC endpoint.
#[derive(Debug, Error)]
pub enum ChainClientError {
    /// Connection, timeout or other transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The node answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ChainClientError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    /// Transient failures are expected to clear up by the next poll.
    pub fn is_transient(&self) -> bool {
        match self {
            ChainClientError::Transport(_) | ChainClientError::Rpc(_) => true,
            ChainClientError::InvalidResponse(_) => false,
        }
    }
}

impl From<jsonrpsee::core::ClientError> for ChainClientError {
    fn from(err: jsonrpsee::core::ClientError) -> Self {
        match err {
            jsonrpsee::core::ClientError::Call(obj) => Self::Rpc(obj.to_string()),
            jsonrpsee::core::ClientError::ParseError(e) => Self::InvalidResponse(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("chain client: {0}")]
    Client(#[from] ChainClientError),

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("failed to fetch logs for block {block}: {errors}")]
    LogFetch { block: u64, errors: String },

    #[error("event queue full")]
    QueueFull,

    #[error("rejected event: {0}")]
    Rejected(String),

    /// Nobody is consuming events anymore.
    #[error("event channel closed")]
    ChannelClosed,

    #[error("invalid poller config: {0}")]
    InvalidConfig(String),

    #[error("rpc server: {0}")]
    Server(String),
}

impl PollerError {
    /// Whether the polling loop should keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PollerError::ChannelClosed | PollerError::InvalidConfig(_) | PollerError::Server(_) => {
                false
            }
            PollerError::Client(_)
            | PollerError::BlockNotFound(_)
            | PollerError::LogFetch { .. }
            | PollerError::QueueFull
            | PollerError::Rejected(_) => true,
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, PollerError>;
