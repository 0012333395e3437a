//! Cohort aggregator
//!
//! Watches the configured chains for task events, distributes tasks to executor operators,
//! aggregates their signed results and submits a certificate once a task reaches its
//! threshold.

mod aggregator;
mod args;
mod errors;
mod rpc;

use args::{Args, EnvArgs};
use cohort_common::logging::{self, FileLoggingConfig, LoggerConfig, OtlpExportConfig};
use cohort_config::{load_config, AggregatorConfig, LoggingConfig};
use errors::InitError;
use tokio::{runtime::Handle, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const SERVICE_NAME: &str = "cohort-aggregator";

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args) {
        eprintln!("FATAL ERROR: {e}");

        return Err(e.into());
    }

    Ok(())
}

fn main_inner(args: Args) -> Result<(), InitError> {
    let config = get_config(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("cohort-rt")
        .build()
        .map_err(InitError::RuntimeBuild)?;

    init_logging(runtime.handle(), &config.logging)?;
    info!(config = %args.config.display(), "loaded configuration");

    let cancel = CancellationToken::new();
    let res = runtime.block_on(async {
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => info!("received ctrl-c"),
                Err(err) => warn!(%err, "failed to listen for ctrl-c"),
            }
            signal_cancel.cancel();
        });

        aggregator::run(config, cancel).await
    });

    logging::finalize();
    res
}

/// Loads the file, applies environment and command line overrides, then validates.
fn get_config(args: &Args) -> Result<AggregatorConfig, InitError> {
    let mut config = load_config(&args.config)?;
    EnvArgs::from_env().apply(&mut config.logging);
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn logger_config(logging: &LoggingConfig) -> LoggerConfig {
    let service_name = logging::format_service_name(SERVICE_NAME, logging.service_label.as_deref());
    let mut lconfig = LoggerConfig::new(service_name)
        .with_service_version(env!("CARGO_PKG_VERSION"))
        .with_json_format(logging.json_format.unwrap_or(false));

    if let Some(url) = &logging.otlp_url {
        lconfig = lconfig.with_otlp(OtlpExportConfig::new(url.clone()));
    }
    if let Some(dir) = &logging.log_dir {
        let prefix = logging.log_file_prefix.as_deref().unwrap_or(SERVICE_NAME);
        lconfig = lconfig.with_file_logging(FileLoggingConfig::new(dir.clone(), prefix));
    }
    lconfig
}

/// Sets up logging inside the runtime context so the OTLP exporter can spawn onto it.
fn init_logging(rt: &Handle, logging: &LoggingConfig) -> Result<(), InitError> {
    let lconfig = logger_config(logging);
    {
        let _g = rt.enter();
        logging::init(lconfig.clone())?;
    }

    if let Some(otlp) = &lconfig.otlp {
        info!(url = %otlp.endpoint, "using OpenTelemetry tracing output");
    }
    if let Some(file) = &lconfig.file {
        info!(
            log_dir = %file.directory.display(),
            log_prefix = %file.file_name_prefix,
            "file logging enabled"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_logger_config_defaults() {
        let lconfig = logger_config(&LoggingConfig::default());
        assert_eq!(lconfig.resource.service_name, "cohort-aggregator");
        assert!(!lconfig.json_format);
        assert!(lconfig.file.is_none());
        assert!(lconfig.otlp.is_none());
    }

    #[test]
    fn test_logger_config_from_table() {
        let logging = LoggingConfig {
            service_label: Some("dev".to_string()),
            otlp_url: Some("http://127.0.0.1:4317".to_string()),
            log_dir: Some(PathBuf::from("/tmp/cohort")),
            log_file_prefix: None,
            json_format: Some(true),
        };
        let lconfig = logger_config(&logging);

        assert_eq!(lconfig.resource.service_name, "cohort-aggregator-dev");
        assert!(lconfig.json_format);
        assert_eq!(lconfig.otlp.unwrap().endpoint, "http://127.0.0.1:4317");
        let file = lconfig.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/tmp/cohort"));
        assert_eq!(file.file_name_prefix, "cohort-aggregator");
    }
}
