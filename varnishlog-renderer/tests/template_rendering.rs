use std::fs;

use tempfile::TempDir;
use varnishlog_core::{DesiredLogConfig, LogFormat, TemplateVariant};
use varnishlog_renderer::{TemplateContext, TemplateEngine};

fn ncsa_config() -> DesiredLogConfig {
    DesiredLogConfig::builder("access")
        .log_format(LogFormat::Varnishncsa)
        .file_name("/var/log/varnish/access.log")
        .pid("/run/varnishncsa.pid")
        .instance_name(Some("edge01".to_owned()))
        .build()
        .expect("config")
}

#[test]
fn systemd_params_carry_instance_and_format() {
    let engine = TemplateEngine::new(None).expect("engine");
    let out = engine
        .render(
            TemplateVariant::Systemd,
            &TemplateContext::for_service(&ncsa_config(), "6.0.11"),
        )
        .expect("render");

    assert!(out.contains("# Rendered for varnish 6.0.11."));
    assert!(out.contains("LOGFILE=/var/log/varnish/access.log\n"));
    assert!(out.contains("PIDFILE=/run/varnishncsa.pid\n"));
    assert!(out.contains("INSTANCE=edge01\n"));
    assert!(out.contains("LOG_FORMAT=\""));
    assert!(out.contains(
        "DAEMON_OPTS=\"-a -w /var/log/varnish/access.log -D -P /run/varnishncsa.pid -n edge01 -F "
    ));
}

#[test]
fn systemd_params_skip_log_format_for_varnish_3() {
    let engine = TemplateEngine::new(None).expect("engine");
    let out = engine
        .render(
            TemplateVariant::Systemd,
            &TemplateContext::for_service(&ncsa_config(), "3.0.7"),
        )
        .expect("render");
    assert!(!out.contains("LOG_FORMAT="));
}

#[test]
fn default_file_has_single_line_daemon_opts() {
    let engine = TemplateEngine::new(None).expect("engine");
    let cfg = DesiredLogConfig::builder("plain").build().expect("config");
    let out = engine
        .render(
            TemplateVariant::Default,
            &TemplateContext::for_service(&cfg, "7.5.0"),
        )
        .expect("render");
    let opts: Vec<&str> = out.lines().filter(|l| l.starts_with("DAEMON_OPTS=")).collect();
    assert_eq!(
        opts,
        vec!["DAEMON_OPTS=\"-a -w /var/log/varnish/varnishlog.log -D -P /var/run/varnishlog.pid\""]
    );
    assert!(out.contains("VARNISHLOG_ENABLED=1"));
}

#[test]
fn logrotate_policy_targets_log_and_pid() {
    let engine = TemplateEngine::new(None).expect("engine");
    let out = engine
        .render(
            TemplateVariant::Logrotate,
            &TemplateContext::for_logrotate(&ncsa_config()),
        )
        .expect("render");
    assert!(out.contains("/var/log/varnish/access.log {"));
    assert!(out.contains("cat /run/varnishncsa.pid"));
    assert!(!out.contains("Rendered for varnish"));
}

#[test]
fn user_template_overrides_embedded_one() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(
        dir.path().join("logrotate.tera"),
        "{{ config.file_name }} { weekly }\n",
    )
    .expect("write override");

    let engine = TemplateEngine::new(Some(dir.path())).expect("engine");
    let out = engine
        .render(
            TemplateVariant::Logrotate,
            &TemplateContext::for_logrotate(&ncsa_config()),
        )
        .expect("render");
    assert_eq!(out, "/var/log/varnish/access.log { weekly }\n");
}

#[test]
fn broken_user_template_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("default.tera"), "{% if %}").expect("write override");
    assert!(TemplateEngine::new(Some(dir.path())).is_err());
}

#[test]
fn crlf_templates_render_with_lf() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("default.tera"), "A=1\r\nB={{ config.name }}\r\n")
        .expect("write override");
    let engine = TemplateEngine::new(Some(dir.path())).expect("engine");
    let out = engine
        .render(
            TemplateVariant::Default,
            &TemplateContext::for_service(&ncsa_config(), "6.0"),
        )
        .expect("render");
    assert_eq!(out, "A=1\nB=access\n");
}
