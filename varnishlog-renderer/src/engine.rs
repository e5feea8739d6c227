//! Tera rendering engine: [`TemplateEngine`] and the variant → template mapping.
//!
//! | Variant     | Template          | Typical destination                         |
//! |-------------|-------------------|---------------------------------------------|
//! | `default`   | `default.tera`    | `/etc/default/<fmt>`, `/etc/sysconfig/<fmt>` |
//! | `systemd`   | `systemd.tera`    | `/etc/systemd/system/<fmt>.params`          |
//! | `logrotate` | `logrotate.tera`  | `<logrotate_path>/<fmt>`                    |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use varnishlog_core::TemplateVariant;

use crate::context::TemplateContext;
use crate::error::{io_err, RenderError};

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("default.tera", include_str!("templates/default.tera")),
    ("systemd.tera", include_str!("templates/systemd.tera")),
    ("logrotate.tera", include_str!("templates/logrotate.tera")),
];

/// Template name rendered for `variant`.
pub fn template_name(variant: TemplateVariant) -> &'static str {
    match variant {
        TemplateVariant::Default => "default.tera",
        TemplateVariant::Systemd => "systemd.tera",
        TemplateVariant::Logrotate => "logrotate.tera",
    }
}

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_owned());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    // Rendered files are shell/logrotate syntax; never HTML-escape.
    tera.autoescape_on(vec![]);
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering templates with optional user overrides.
///
/// `user_template_dir` may contain `default.tera`, `systemd.tera` or
/// `logrotate.tera`, each replacing the embedded template of the same name.
#[derive(Debug)]
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Construct a new [`TemplateEngine`], loading embedded templates plus any
    /// overrides found in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render `variant` with `ctx`. Output always uses LF line endings.
    pub fn render(
        &self,
        variant: TemplateVariant,
        ctx: &TemplateContext,
    ) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let content = self.tera.render(template_name(variant), &tera_ctx)?;
        Ok(normalize_line_endings(&content))
    }
}

/// Normalise CRLF to LF so hashes do not depend on template checkout style.
pub fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
