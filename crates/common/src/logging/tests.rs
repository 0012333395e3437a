use std::{path::PathBuf, time::Duration};

use super::{manager::build_filter, types::DEFAULT_DIRECTIVES, *};

fn has_attr(resource: &opentelemetry_sdk::Resource, key: &str, value: &str) -> bool {
    resource
        .iter()
        .any(|(k, v)| k.as_str() == key && v.as_str() == value)
}

#[test]
fn test_format_service_name() {
    assert_eq!(format_service_name("cohort-aggregator", None), "cohort-aggregator");
    assert_eq!(format_service_name("cohort-aggregator", Some("")), "cohort-aggregator");
    assert_eq!(
        format_service_name("cohort-aggregator", Some("dev")),
        "cohort-aggregator-dev"
    );
}

#[test]
fn test_resource_carries_service_identity() {
    let config = LoggerConfig::new("cohort-aggregator")
        .with_service_version("0.1.0")
        .with_resource_attribute("operator.address", "0xabc");

    let resource = config.resource.build_resource();
    assert!(has_attr(&resource, "service.name", "cohort-aggregator"));
    assert!(has_attr(&resource, "service.version", "0.1.0"));
    assert!(has_attr(&resource, "operator.address", "0xabc"));
}

#[test]
fn test_minimal_resource_has_only_name() {
    let resource = ResourceConfig::new("svc").build_resource();
    assert!(has_attr(&resource, "service.name", "svc"));
    assert_eq!(resource.len(), 1);
}

#[test]
fn test_logger_config_defaults() {
    let config = LoggerConfig::new("svc");
    assert!(!config.json_format);
    assert!(config.file.is_none());
    assert!(config.otlp.is_none());
    assert_eq!(config.directives.len(), DEFAULT_DIRECTIVES.len());
}

#[test]
fn test_logger_config_builder() {
    let config = LoggerConfig::new("svc")
        .with_json_format(true)
        .with_directive("cohort_execution=debug")
        .with_file_logging(
            FileLoggingConfig::new(PathBuf::from("/tmp/logs"), "cohort")
                .with_rotation(Rotation::HOURLY)
                .with_json_format(true),
        )
        .with_otlp(OtlpExportConfig::new("http://localhost:4317"));

    assert!(config.json_format);
    assert_eq!(config.directives.last().unwrap(), "cohort_execution=debug");
    let file = config.file.unwrap();
    assert_eq!(file.file_name_prefix, "cohort");
    assert!(file.json_format);
    let otlp = config.otlp.unwrap();
    assert_eq!(otlp.endpoint, "http://localhost:4317");
    assert_eq!(otlp.timeout, Duration::from_secs(10));
}

#[test]
fn test_build_filter_accepts_default_directives() {
    let directives: Vec<String> = DEFAULT_DIRECTIVES.iter().map(|d| d.to_string()).collect();
    assert!(build_filter(&directives).is_ok());
}

#[test]
fn test_build_filter_rejects_bad_directive() {
    let err = build_filter(&["cohort=notalevel".to_string()]).unwrap_err();
    assert!(matches!(err, LoggingError::InvalidDirective { directive, .. } if directive == "cohort=notalevel"));
}
