use std::{path::PathBuf, time::Duration};

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use tracing_appender::rolling::Rotation;

/// Directives applied on top of `RUST_LOG` unless overridden.
pub(crate) const DEFAULT_DIRECTIVES: &[&str] = &["hyper=warn", "h2=warn", "tower=warn"];

/// Rolling log file output.
#[derive(Debug, Clone)]
pub struct FileLoggingConfig {
    pub directory: PathBuf,
    /// File name prefix, the appender adds the date suffix.
    pub file_name_prefix: String,
    pub rotation: Rotation,
    pub json_format: bool,
}

impl FileLoggingConfig {
    pub fn new(directory: PathBuf, file_name_prefix: impl Into<String>) -> Self {
        Self {
            directory,
            file_name_prefix: file_name_prefix.into(),
            rotation: Rotation::DAILY,
            json_format: false,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_json_format(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }
}

/// Where and how spans are exported over OTLP.
#[derive(Debug, Clone)]
pub struct OtlpExportConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl OtlpExportConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// OpenTelemetry resource attributes describing this process.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    pub service_name: String,
    pub service_version: Option<String>,
    pub attributes: Vec<KeyValue>,
}

impl ResourceConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: None,
            attributes: Vec::new(),
        }
    }

    pub fn build_resource(&self) -> Resource {
        let mut attributes = vec![KeyValue::new("service.name", self.service_name.clone())];
        if let Some(version) = &self.service_version {
            attributes.push(KeyValue::new("service.version", version.clone()));
        }
        attributes.extend(self.attributes.iter().cloned());
        Resource::new(attributes)
    }
}

/// Full logger setup handed to [`init`](super::init).
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub resource: ResourceConfig,
    /// JSON lines on stdout instead of the compact format.
    pub json_format: bool,
    /// Extra `EnvFilter` directives, e.g. `cohort_execution=debug`.
    pub directives: Vec<String>,
    pub file: Option<FileLoggingConfig>,
    pub otlp: Option<OtlpExportConfig>,
}

impl LoggerConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            resource: ResourceConfig::new(service_name),
            json_format: false,
            directives: DEFAULT_DIRECTIVES.iter().map(|d| d.to_string()).collect(),
            file: None,
            otlp: None,
        }
    }

    pub fn with_service_version(mut self, version: impl Into<String>) -> Self {
        self.resource.service_version = Some(version.into());
        self
    }

    pub fn with_resource_attribute(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.resource
            .attributes
            .push(KeyValue::new(key, value.into()));
        self
    }

    pub fn with_json_format(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn with_file_logging(mut self, file: FileLoggingConfig) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_otlp(mut self, otlp: OtlpExportConfig) -> Self {
        self.otlp = Some(otlp);
        self
    }
}
