//! CLI argument parsing and environment variable handling.

use std::{env, path::PathBuf};

use argh::FromArgs;
use cohort_config::{AggregatorConfig, LoggingConfig};

/// Logging settings overridable by environment.
#[derive(Debug, Clone, Default)]
pub(crate) struct EnvArgs {
    pub otlp_url: Option<String>,
    pub service_label: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub log_file_prefix: Option<String>,
    pub log_json: Option<bool>,
}

impl EnvArgs {
    pub(crate) fn from_env() -> Self {
        Self {
            otlp_url: env::var("COHORT_OTLP_URL").ok(),
            service_label: env::var("COHORT_SVC_LABEL").ok(),
            log_dir: env::var("COHORT_LOG_DIR").ok().map(PathBuf::from),
            log_file_prefix: env::var("COHORT_LOG_FILE_PREFIX").ok(),
            log_json: env::var("COHORT_LOG_JSON").ok().map(|v| parse_flag(&v)),
        }
    }

    /// Environment values win over the `[logging]` table.
    pub(crate) fn apply(&self, logging: &mut LoggingConfig) {
        if let Some(url) = &self.otlp_url {
            logging.otlp_url = Some(url.clone());
        }
        if let Some(label) = &self.service_label {
            logging.service_label = Some(label.clone());
        }
        if let Some(dir) = &self.log_dir {
            logging.log_dir = Some(dir.clone());
        }
        if let Some(prefix) = &self.log_file_prefix {
            logging.log_file_prefix = Some(prefix.clone());
        }
        if let Some(json) = self.log_json {
            logging.json_format = Some(json);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "Cohort AVS task aggregator")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    pub config: PathBuf,

    /// Port of the aggregator RPC server, overrides `server.port`.
    #[argh(option, description = "rpc port")]
    pub rpc_port: Option<u16>,

    #[argh(switch, description = "log as json lines")]
    pub log_json: bool,
}

impl Args {
    /// Command line values win over both the file and the environment.
    pub(crate) fn apply(&self, config: &mut AggregatorConfig) {
        if let Some(port) = self.rpc_port {
            config.server.port = port;
        }
        if self.log_json {
            config.logging.json_format = Some(true);
        }
    }
}
