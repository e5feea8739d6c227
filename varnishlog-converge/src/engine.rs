//! The apply sequence for one logging resource.
//!
//! 1. Select the destination + template variant for the platform.
//! 2. Render the main configuration; remember whether it changed.
//! 3. Render the logrotate policy when enabled and its directory exists.
//! 4. Enable and start the service (no-ops when already so).
//! 5. Drain delayed notifications: one restart if step 2 changed anything.
//!
//! Every step re-derives state from the host, so a second run with the same
//! inputs changes nothing.

use std::path::PathBuf;

use serde::Serialize;

use varnishlog_core::{DesiredLogConfig, PlatformContext, TemplatePlan, TemplateVariant};
use varnishlog_renderer::TemplateContext;
use varnishlog_service::{GuardedServiceManager, ServiceManager, Sleeper, ThreadSleeper};

use crate::error::ConvergeError;
use crate::notify::{NotificationEdge, NotificationQueue, NotifyAction};
use crate::probe::FileSystemProbe;
use crate::selector::select;
use crate::writer::FileRenderer;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub variant: TemplateVariant,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogrotateOutcome {
    Applied { path: PathBuf, changed: bool },
    SkippedDisabled,
    /// The logrotate directory is absent; not an error.
    SkippedMissingDir { dir: PathBuf },
}

impl LogrotateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LogrotateOutcome::Applied { .. })
    }
}

/// A state-changing service operation, issued (or planned, in dry-run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Enable,
    Start,
    Restart,
}

/// What one `apply` did to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyResult {
    pub name: String,
    pub service: String,
    pub plan: TemplatePlan,
    pub files: Vec<FileOutcome>,
    pub logrotate: LogrotateOutcome,
    pub actions: Vec<ServiceAction>,
    /// The service was started or restarted (or would be, in dry-run).
    pub restarted: bool,
    pub dry_run: bool,
}

impl ApplyResult {
    /// Whether anything on the host changed (or would change).
    pub fn changed(&self) -> bool {
        self.files.iter().any(|f| f.changed) || !self.actions.is_empty()
    }

    pub fn changed_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| f.changed)
    }
}

// ---------------------------------------------------------------------------
// ConvergenceEngine
// ---------------------------------------------------------------------------

/// Drives one resource to its desired state through injected collaborators.
pub struct ConvergenceEngine<R, P, M, S = ThreadSleeper> {
    renderer: R,
    probe: P,
    services: GuardedServiceManager<M, S>,
    varnish_version: String,
}

impl<R, P, M, S> ConvergenceEngine<R, P, M, S>
where
    R: FileRenderer,
    P: FileSystemProbe,
    M: ServiceManager,
    S: Sleeper,
{
    pub fn new(
        renderer: R,
        probe: P,
        services: GuardedServiceManager<M, S>,
        varnish_version: impl Into<String>,
    ) -> Self {
        Self {
            renderer,
            probe,
            services,
            varnish_version: varnish_version.into(),
        }
    }

    /// Follows the renderer: a dry-run renderer makes the whole run a dry run,
    /// where service state is queried but never changed.
    pub fn is_dry_run(&self) -> bool {
        self.renderer.is_dry_run()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn services(&self) -> &GuardedServiceManager<M, S> {
        &self.services
    }

    pub fn varnish_version(&self) -> &str {
        &self.varnish_version
    }

    pub fn apply(
        &self,
        config: &DesiredLogConfig,
        platform: &PlatformContext,
    ) -> Result<ApplyResult, ConvergeError> {
        let service = config.log_format().service_name();
        let dry_run = self.is_dry_run();
        let plan = select(platform, config.log_format());
        let mut queue = NotificationQueue::new();
        let mut files = Vec::new();

        tracing::info!(
            resource = %config.name(),
            %service,
            destination = %plan.destination_path.display(),
            variant = %plan.variant,
            dry_run,
            "converging"
        );

        let ctx = TemplateContext::for_service(config, &self.varnish_version);
        let changed = self
            .renderer
            .render(&plan.destination_path, plan.variant, &ctx)?;
        files.push(FileOutcome {
            path: plan.destination_path.clone(),
            variant: plan.variant,
            changed,
        });
        if changed {
            queue.notify(NotificationEdge::delayed_restart(service));
        }

        let logrotate = self.apply_logrotate(config)?;
        if let LogrotateOutcome::Applied { path, changed } = &logrotate {
            files.push(FileOutcome {
                path: path.clone(),
                variant: TemplateVariant::Logrotate,
                changed: *changed,
            });
        }

        let mut actions = self.ensure_running(service, dry_run)?;

        for edge in queue.drain() {
            match edge.action {
                NotifyAction::Restart => {
                    if dry_run {
                        tracing::info!(service = %edge.target_service, "[dry-run] would restart");
                    } else {
                        self.services.guarded_restart(&edge.target_service)?;
                        tracing::info!(service = %edge.target_service, "restarted");
                    }
                    actions.push(ServiceAction::Restart);
                }
            }
        }

        let restarted = actions
            .iter()
            .any(|a| matches!(a, ServiceAction::Start | ServiceAction::Restart));

        Ok(ApplyResult {
            name: config.name().to_owned(),
            service: service.to_owned(),
            plan,
            files,
            logrotate,
            actions,
            restarted,
            dry_run,
        })
    }

    fn apply_logrotate(&self, config: &DesiredLogConfig) -> Result<LogrotateOutcome, ConvergeError> {
        if !config.logrotate() {
            return Ok(LogrotateOutcome::SkippedDisabled);
        }
        let dir = config.logrotate_path();
        if !self.probe.exists(dir) {
            tracing::debug!(dir = %dir.display(), "logrotate directory absent, skipping");
            return Ok(LogrotateOutcome::SkippedMissingDir {
                dir: dir.to_path_buf(),
            });
        }
        let path = config.logrotate_destination();
        let ctx = TemplateContext::for_logrotate(config);
        let changed = self
            .renderer
            .render(&path, TemplateVariant::Logrotate, &ctx)?;
        Ok(LogrotateOutcome::Applied { path, changed })
    }

    fn ensure_running(&self, service: &str, dry_run: bool) -> Result<Vec<ServiceAction>, ConvergeError> {
        let mut actions = Vec::new();

        if !self.services.is_enabled(service)? {
            if !dry_run {
                self.services.enable(service)?;
            }
            tracing::info!(%service, dry_run, "enabled");
            actions.push(ServiceAction::Enable);
        }

        if !self.services.is_active(service)? {
            if !dry_run {
                self.services.guarded_start(service)?;
            }
            tracing::info!(%service, dry_run, "started");
            actions.push(ServiceAction::Start);
        }

        Ok(actions)
    }
}
