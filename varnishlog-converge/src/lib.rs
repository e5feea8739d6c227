//! # varnishlog-converge
//!
//! Converges a host's varnishlog/varnishncsa setup to a [`DesiredLogConfig`]:
//! picks the platform's config location, renders it (plus an optional
//! logrotate policy), makes sure the service is enabled and running, and
//! restarts it once when its configuration changed.
//!
//! [`DesiredLogConfig`]: varnishlog_core::DesiredLogConfig

pub mod engine;
pub mod error;
pub mod notify;
pub mod probe;
pub mod selector;
pub mod writer;

pub use engine::{ApplyResult, ConvergenceEngine, FileOutcome, LogrotateOutcome, ServiceAction};
pub use error::ConvergeError;
pub use notify::{NotificationEdge, NotificationQueue, NotifyAction, NotifyTiming};
pub use probe::{rebase, FileSystemProbe, StdFsProbe};
pub use selector::select;
pub use writer::{DiskRenderer, FileRenderer, WriteResult, FILE_MODE};
