//! # varnishlog-renderer
//!
//! Tera-based engine that renders the varnishlog/varnishncsa service
//! configuration and logrotate policy from a validated desired state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use varnishlog_core::{DesiredLogConfig, TemplateVariant};
//! use varnishlog_renderer::{TemplateContext, TemplateEngine};
//!
//! fn render(config: &DesiredLogConfig) {
//!     if let Ok(engine) = TemplateEngine::new(None) {
//!         let ctx = TemplateContext::for_service(config, "6.0.11");
//!         if let Ok(text) = engine.render(TemplateVariant::Systemd, &ctx) {
//!             println!("{text}");
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::TemplateContext;
pub use engine::{normalize_line_endings, TemplateEngine};
pub use error::{io_err, RenderError};
