//! Aggregator configuration loaded from TOML.

use std::{fs, path::Path};

mod config;
mod errors;
mod validate;

pub use config::{
    AggregatorConfig, AvsConfig, ChainConfig, ChainSimulationConfig, LoggingConfig,
    MailboxContract, OperatorConfig, PeerConfig, PeeringConfig, PollerKind, ServerConfig,
    SigningCurve, SigningKey, DEFAULT_SERVER_PORT,
};
pub use errors::{ConfigError, ValidationIssue};

/// Parses a config without validating it.
pub fn parse_config(contents: &str) -> Result<AggregatorConfig, ConfigError> {
    Ok(toml::from_str(contents)?)
}

/// Reads and parses the config at `path`.
///
/// Validation is left to the caller so command line overrides can be applied first.
pub fn load_config(path: &Path) -> Result<AggregatorConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents)
}
