//! Error types for varnishlog-converge.

use thiserror::Error;

use varnishlog_renderer::RenderError;
use varnishlog_service::{ServiceError, ServiceLifecycleError};

/// Everything that can stop a convergence run.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Rendering or writing a file failed. Never retried.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// A guarded start/restart exhausted its attempts.
    #[error(transparent)]
    Lifecycle(#[from] ServiceLifecycleError),

    /// An unguarded primitive (enable, state query) failed.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
}
