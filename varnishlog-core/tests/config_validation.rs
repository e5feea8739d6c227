//! Desired-state validation through the YAML loader.

use std::path::Path;

use rstest::rstest;
use varnishlog_core::{config, ConfigError, LogFormat, ValidationError};

fn parse(yaml: &str) -> Result<Vec<varnishlog_core::DesiredLogConfig>, ConfigError> {
    config::parse(Path::new("test.yaml"), yaml)
}

#[rstest]
#[case("varnishlog", LogFormat::Varnishlog)]
#[case("varnishncsa", LogFormat::Varnishncsa)]
fn accepted_formats(#[case] raw: &str, #[case] expected: LogFormat) {
    let yaml = format!("logs:\n  - name: r\n    log_format: {raw}\n");
    let configs = parse(&yaml).expect("parse");
    assert_eq!(configs[0].log_format(), expected);
}

#[rstest]
#[case("varnishtop")]
#[case("VARNISHLOG")]
#[case("\"\"")]
fn rejected_formats(#[case] raw: &str) {
    let yaml = format!("logs:\n  - name: r\n    log_format: {raw}\n");
    let err = parse(&yaml).expect_err("must reject");
    match err {
        ConfigError::Invalid { source, .. } => {
            assert!(matches!(source, ValidationError::InvalidLogFormat { .. }))
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn empty_name_rejected() {
    let err = parse("logs:\n  - name: \"\"\n").expect_err("must reject");
    assert!(matches!(
        err,
        ConfigError::Invalid {
            source: ValidationError::EmptyName,
            ..
        }
    ));
}

#[test]
fn duplicate_names_rejected() {
    let yaml = "logs:\n  - name: a\n  - name: a\n    log_format: varnishncsa\n";
    let err = parse(yaml).expect_err("must reject");
    assert!(err.to_string().contains("duplicate resource name 'a'"));
}

#[test]
fn file_order_preserved() {
    let yaml = "logs:\n  - name: first\n    log_format: varnishncsa\n  - name: second\n";
    let names: Vec<String> = parse(yaml)
        .expect("parse")
        .iter()
        .map(|c| c.name().to_owned())
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn instance_name_is_optional() {
    let configs = parse("logs:\n  - name: a\n    instance_name: edge01\n  - name: b\n").unwrap();
    assert_eq!(configs[0].instance_name(), Some("edge01"));
    assert_eq!(configs[1].instance_name(), None);
}
