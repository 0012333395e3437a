//! Subscriber installation and shutdown.

use std::sync::OnceLock;

use opentelemetry::{
    global::{self, set_text_map_propagator},
    trace::TracerProvider,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    runtime::Tokio,
    trace::{Config, Tracer, TracerProvider as SdkTracerProvider},
};
use tracing::{debug, error, info, Level};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    filter::Directive, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
    Layer,
};

use super::{
    errors::LoggingError,
    types::{LoggerConfig, OtlpExportConfig, ResourceConfig},
};

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// `INFO` by default, `RUST_LOG` on top, then the configured directives.
pub(crate) fn build_filter(directives: &[String]) -> Result<EnvFilter, LoggingError> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    for directive in directives {
        let parsed: Directive =
            directive
                .parse()
                .map_err(|source| LoggingError::InvalidDirective {
                    directive: directive.clone(),
                    source,
                })?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

/// Installs the global subscriber.
///
/// OTLP export needs a tokio runtime to be entered. Fails if a subscriber is already set.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    set_text_map_propagator(TraceContextPropagator::new());

    let stdout_layer = if config.json_format {
        layer()
            .json()
            .with_filter(build_filter(&config.directives)?)
            .boxed()
    } else {
        layer()
            .compact()
            .with_filter(build_filter(&config.directives)?)
            .boxed()
    };

    let file_layer = match &config.file {
        Some(file) => {
            let appender =
                RollingFileAppender::new(file.rotation.clone(), &file.directory, &file.file_name_prefix);
            let filter = build_filter(&config.directives)?;
            let layer = if file.json_format {
                layer()
                    .json()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_filter(filter)
                    .boxed()
            } else {
                layer()
                    .compact()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_filter(filter)
                    .boxed()
            };
            Some(layer)
        }
        None => None,
    };

    let otel_layer = match &config.otlp {
        Some(otlp) => {
            let tracer = build_tracer(otlp, &config.resource)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(otel_layer)
        .try_init()?;

    info!(
        service_name = %config.resource.service_name,
        service_version = ?config.resource.service_version,
        json = config.json_format,
        "logging initialized"
    );
    if let Some(otlp) = &config.otlp {
        info!(endpoint = %otlp.endpoint, "exporting spans over otlp");
    }
    if let Some(file) = &config.file {
        info!(
            log_dir = %file.directory.display(),
            prefix = %file.file_name_prefix,
            "file logging enabled"
        );
    }
    Ok(())
}

fn build_tracer(otlp: &OtlpExportConfig, resource: &ResourceConfig) -> Result<Tracer, LoggingError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(otlp.endpoint.clone())
        .with_timeout(otlp.timeout);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(Config::default().with_resource(resource.build_resource()))
        .install_batch(Tokio)?;

    let tracer = provider.tracer("cohort");
    if TRACER_PROVIDER.set(provider).is_err() {
        error!("tracer provider already installed");
    }
    Ok(tracer)
}

/// Flushes pending spans and shuts the exporter down.
///
/// Call once before the process exits.
pub fn finalize() {
    info!("shutting down logging");
    match TRACER_PROVIDER.get() {
        Some(provider) => {
            if let Err(err) = provider.shutdown() {
                error!(%err, "failed to shut down tracer provider");
            }
        }
        None => debug!("no tracer provider to shut down"),
    }
    global::shutdown_tracer_provider();
}
