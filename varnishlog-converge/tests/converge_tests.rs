//! Apply-sequence behaviour of `ConvergenceEngine` against in-memory fakes.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use varnishlog_converge::{
    ConvergeError, ConvergenceEngine, FileRenderer, FileSystemProbe, LogrotateOutcome,
    ServiceAction,
};
use varnishlog_core::{DesiredLogConfig, LogFormat, PlatformContext, TemplateVariant};
use varnishlog_renderer::{io_err, RenderError, TemplateContext};
use varnishlog_service::{GuardedServiceManager, ServiceError, ServiceManager, Sleeper};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Keeps "rendered" files in memory; content is the variant plus the context.
#[derive(Default)]
struct MemRenderer {
    files: Mutex<HashMap<PathBuf, String>>,
    fail_on: Option<PathBuf>,
    dry_run: bool,
}

impl MemRenderer {
    fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    fn failing_on(path: &str) -> Self {
        Self {
            fail_on: Some(PathBuf::from(path)),
            ..Self::default()
        }
    }

    fn paths(&self) -> HashSet<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    fn forget(&self, path: &str) {
        self.files.lock().unwrap().remove(Path::new(path));
    }
}

impl FileRenderer for MemRenderer {
    fn render(
        &self,
        path: &Path,
        variant: TemplateVariant,
        ctx: &TemplateContext,
    ) -> Result<bool, RenderError> {
        if self.fail_on.as_deref() == Some(path) {
            return Err(io_err(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        let content = format!("{variant}|{ctx:?}");
        let previous = self
            .files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.clone());
        Ok(previous.as_deref() != Some(content.as_str()))
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[derive(Default)]
struct DirSet(HashSet<PathBuf>);

impl DirSet {
    fn with(dir: &str) -> Self {
        Self(HashSet::from([PathBuf::from(dir)]))
    }
}

impl FileSystemProbe for DirSet {
    fn exists(&self, path: &Path) -> bool {
        self.0.contains(path)
    }
}

/// A host whose services remember being enabled and started.
#[derive(Default)]
struct FakeHost {
    enabled: Mutex<HashSet<String>>,
    active: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(&'static str, String)>>,
    start_failures: Mutex<u32>,
}

impl FakeHost {
    fn failing_starts(n: u32) -> Self {
        let host = Self::default();
        *host.start_failures.lock().unwrap() = n;
        host
    }

    fn count(&self, verb: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(v, _)| *v == verb).count()
    }

    fn record(&self, verb: &'static str, name: &str) {
        self.calls.lock().unwrap().push((verb, name.to_owned()));
    }
}

impl ServiceManager for FakeHost {
    fn kind(&self) -> &'static str {
        "fake"
    }
    fn enable(&self, name: &str) -> Result<(), ServiceError> {
        self.record("enable", name);
        self.enabled.lock().unwrap().insert(name.to_owned());
        Ok(())
    }
    fn start(&self, name: &str) -> Result<(), ServiceError> {
        self.record("start", name);
        let mut failures = self.start_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(ServiceError::CommandFailed {
                command: format!("systemctl start {name}"),
                status: "exit status: 1".to_owned(),
                stderr: "Cannot open /var/lib/varnish/_.vsm".to_owned(),
            });
        }
        self.active.lock().unwrap().insert(name.to_owned());
        Ok(())
    }
    fn restart(&self, name: &str) -> Result<(), ServiceError> {
        self.record("restart", name);
        self.active.lock().unwrap().insert(name.to_owned());
        Ok(())
    }
    fn reload(&self, name: &str) -> Result<(), ServiceError> {
        self.record("reload", name);
        Ok(())
    }
    fn is_enabled(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(self.enabled.lock().unwrap().contains(name))
    }
    fn is_active(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(self.active.lock().unwrap().contains(name))
    }
}

#[derive(Default)]
struct RecordingSleeper(Mutex<Vec<Duration>>);

impl RecordingSleeper {
    fn naps(&self) -> Vec<Duration> {
        self.0.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.0.lock().unwrap().push(duration);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Engine<'a> =
    ConvergenceEngine<&'a MemRenderer, &'a DirSet, &'a FakeHost, &'a RecordingSleeper>;

fn engine<'a>(
    renderer: &'a MemRenderer,
    probe: &'a DirSet,
    host: &'a FakeHost,
    sleeper: &'a RecordingSleeper,
    version: &str,
) -> Engine<'a> {
    let services = GuardedServiceManager::new(host).with_sleeper(sleeper);
    ConvergenceEngine::new(renderer, probe, services, version)
}

fn ncsa_config() -> DesiredLogConfig {
    DesiredLogConfig::builder("access-log")
        .log_format(LogFormat::Varnishncsa)
        .build()
        .unwrap()
}

fn rhel_systemd() -> PlatformContext {
    PlatformContext::new("rhel", "systemd")
}

const FIVE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn rhel_systemd_ncsa_first_run() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::with("/etc/logrotate.d"),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let result = engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&ncsa_config(), &rhel_systemd())
        .expect("apply");

    assert_eq!(
        result.plan.destination_path,
        PathBuf::from("/etc/systemd/system/varnishncsa.params")
    );
    assert_eq!(result.plan.variant, TemplateVariant::Systemd);
    assert_eq!(
        renderer.paths(),
        HashSet::from([
            PathBuf::from("/etc/systemd/system/varnishncsa.params"),
            PathBuf::from("/etc/logrotate.d/varnishncsa"),
        ])
    );
    assert!(result.logrotate.is_applied());
    assert_eq!(
        result.actions,
        [ServiceAction::Enable, ServiceAction::Start, ServiceAction::Restart]
    );
    assert!(result.restarted);
    assert_eq!(result.service, "varnishncsa");

    // One delay before the start attempt, one before the restart attempt.
    assert_eq!(sleeper.naps(), [FIVE, FIVE]);
    assert_eq!(host.count("enable"), 1);
    assert_eq!(host.count("start"), 1);
    assert_eq!(host.count("restart"), 1);
}

#[test]
fn second_run_is_a_noop() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::with("/etc/logrotate.d"),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let engine = engine(&renderer, &probe, &host, &sleeper, "6.0.11");
    engine.apply(&ncsa_config(), &rhel_systemd()).expect("first");
    let calls_after_first = host.calls.lock().unwrap().len();

    let second = engine.apply(&ncsa_config(), &rhel_systemd()).expect("second");
    assert!(second.files.iter().all(|f| !f.changed));
    assert!(second.actions.is_empty());
    assert!(!second.restarted);
    assert!(!second.changed());
    assert_eq!(host.calls.lock().unwrap().len(), calls_after_first);
}

#[test]
fn version_change_restarts_exactly_once() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::default(),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&ncsa_config(), &rhel_systemd())
        .expect("first");
    let result = engine(&renderer, &probe, &host, &sleeper, "7.1.0")
        .apply(&ncsa_config(), &rhel_systemd())
        .expect("upgrade");

    assert_eq!(result.actions, [ServiceAction::Restart]);
    assert_eq!(host.count("restart"), 2);
    assert_eq!(result.changed_files().count(), 1);
}

#[test]
fn missing_logrotate_dir_is_skipped_silently() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::default(),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let result = engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&ncsa_config(), &rhel_systemd())
        .expect("apply");

    assert_eq!(
        result.logrotate,
        LogrotateOutcome::SkippedMissingDir {
            dir: PathBuf::from("/etc/logrotate.d")
        }
    );
    assert_eq!(result.files.len(), 1);
    assert_eq!(renderer.paths().len(), 1);
}

#[test]
fn disabled_logrotate_never_probes_or_writes() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::with("/etc/logrotate.d"),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let config = DesiredLogConfig::builder("quiet")
        .logrotate(false)
        .build()
        .unwrap();
    let result = engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&config, &rhel_systemd())
        .expect("apply");

    assert_eq!(result.logrotate, LogrotateOutcome::SkippedDisabled);
    assert_eq!(renderer.paths().len(), 1);
}

#[test]
fn custom_logrotate_path_is_honoured() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::with("/opt/logrotate"),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let config = DesiredLogConfig::builder("custom")
        .logrotate_path("/opt/logrotate")
        .build()
        .unwrap();
    let result = engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&config, &rhel_systemd())
        .expect("apply");

    assert_eq!(
        result.logrotate,
        LogrotateOutcome::Applied {
            path: PathBuf::from("/opt/logrotate/varnishlog"),
            changed: true
        }
    );
}

#[test]
fn logrotate_change_alone_does_not_restart() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::with("/etc/logrotate.d"),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let engine = engine(&renderer, &probe, &host, &sleeper, "6.0.11");
    engine.apply(&ncsa_config(), &rhel_systemd()).expect("first");
    renderer.forget("/etc/logrotate.d/varnishncsa");

    let result = engine.apply(&ncsa_config(), &rhel_systemd()).expect("second");
    assert_eq!(
        result.logrotate,
        LogrotateOutcome::Applied {
            path: PathBuf::from("/etc/logrotate.d/varnishncsa"),
            changed: true
        }
    );
    assert!(!result.restarted);
    assert_eq!(host.count("restart"), 1);
}

#[test]
fn stopped_service_is_started_and_reported() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::default(),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let engine = engine(&renderer, &probe, &host, &sleeper, "6.0.11");
    engine.apply(&ncsa_config(), &rhel_systemd()).expect("first");
    host.active.lock().unwrap().remove("varnishncsa");

    let result = engine.apply(&ncsa_config(), &rhel_systemd()).expect("second");
    assert_eq!(result.actions, [ServiceAction::Start]);
    assert!(result.restarted);
    assert!(result.changed());
    assert_eq!(host.count("start"), 2);
    assert_eq!(host.count("restart"), 1);
}

#[test]
fn debian_uses_default_file_even_under_systemd() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::default(),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let config = DesiredLogConfig::builder("debian").build().unwrap();
    let result = engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&config, &PlatformContext::new("debian", "systemd"))
        .expect("apply");

    assert_eq!(
        result.plan.destination_path,
        PathBuf::from("/etc/default/varnishlog")
    );
    assert_eq!(result.plan.variant, TemplateVariant::Default);
    assert_eq!(result.service, "varnishlog");
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn render_error_stops_before_any_service_call() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::failing_on("/etc/systemd/system/varnishncsa.params"),
        DirSet::with("/etc/logrotate.d"),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let err = engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&ncsa_config(), &rhel_systemd())
        .unwrap_err();

    assert!(matches!(err, ConvergeError::Render(_)), "{err}");
    assert!(host.calls.lock().unwrap().is_empty());
    assert!(sleeper.naps().is_empty());
}

#[test]
fn transient_start_failures_are_absorbed() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::default(),
        FakeHost::failing_starts(2),
        RecordingSleeper::default(),
    );
    let result = engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&ncsa_config(), &rhel_systemd())
        .expect("apply");

    assert!(result.actions.contains(&ServiceAction::Start));
    assert_eq!(host.count("start"), 3);
    // Three start attempts plus the restart attempt.
    assert_eq!(sleeper.naps().len(), 4);
}

#[test]
fn exhausted_start_surfaces_lifecycle_error() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::default(),
        DirSet::default(),
        FakeHost::failing_starts(u32::MAX),
        RecordingSleeper::default(),
    );
    let err = engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&ncsa_config(), &rhel_systemd())
        .unwrap_err();

    match err {
        ConvergeError::Lifecycle(e) => {
            assert_eq!(e.service_name, "varnishncsa");
            assert_eq!(e.attempts, 5);
        }
        other => panic!("expected lifecycle error, got {other}"),
    }
    assert_eq!(host.count("start"), 5);
    assert_eq!(host.count("restart"), 0);
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[test]
fn dry_run_plans_but_never_touches_services() {
    let (renderer, probe, host, sleeper) = (
        MemRenderer::dry_run(),
        DirSet::default(),
        FakeHost::default(),
        RecordingSleeper::default(),
    );
    let result = engine(&renderer, &probe, &host, &sleeper, "6.0.11")
        .apply(&ncsa_config(), &rhel_systemd())
        .expect("apply");

    assert!(result.dry_run);
    assert_eq!(
        result.actions,
        [ServiceAction::Enable, ServiceAction::Start, ServiceAction::Restart]
    );
    assert!(result.restarted);
    assert!(host.calls.lock().unwrap().is_empty());
    assert!(sleeper.naps().is_empty());
}
