use opentelemetry::trace::TraceError;
use thiserror::Error;
use tracing_subscriber::{filter::ParseError, util::TryInitError};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log directive '{directive}': {source}")]
    InvalidDirective {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("otlp pipeline: {0}")]
    Otlp(#[from] TraceError),

    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}
