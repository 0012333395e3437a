//! Logging to stdout, rolling files and an optional OTLP collector.

mod errors;
mod manager;
mod types;

#[cfg(test)]
mod tests;

pub use errors::LoggingError;
pub use manager::{finalize, init};
pub use tracing_appender::rolling::Rotation;
pub use types::{FileLoggingConfig, LoggerConfig, OtlpExportConfig, ResourceConfig};

/// Joins a base service name and an optional deployment label, e.g. `cohort-aggregator-dev`.
pub fn format_service_name(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) if !label.is_empty() => format!("{base}-{label}"),
        _ => base.to_owned(),
    }
}
