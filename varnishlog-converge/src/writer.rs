//! Hash-gated atomic writer for rendered configuration.
//!
//! ## `DiskRenderer::write_rendered` protocol
//!
//! 1. Normalise line endings to LF.
//! 2. SHA-256 the rendered content and the raw bytes currently on disk.
//! 3. Identical → only correct a drifted mode or owner, otherwise report unchanged.
//! 4. Write `<path>.varnishlog.tmp`, set mode `0644` and ownership.
//! 5. Rename over the final path (atomic on POSIX); drop the tmp on failure.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use similar::TextDiff;

use varnishlog_core::TemplateVariant;
use varnishlog_renderer::{
    io_err, normalize_line_endings, RenderError, TemplateContext, TemplateEngine,
};

use crate::probe::rebase;

/// Permission bits of every rendered artifact.
pub const FILE_MODE: u32 = 0o644;

// ---------------------------------------------------------------------------
// FileRenderer
// ---------------------------------------------------------------------------

/// Materialises one template variant at `path`, reporting whether the
/// file on disk changed as a result.
pub trait FileRenderer: Send + Sync {
    fn render(
        &self,
        path: &Path,
        variant: TemplateVariant,
        ctx: &TemplateContext,
    ) -> Result<bool, RenderError>;

    /// A dry-run renderer reports what would change and writes nothing.
    fn is_dry_run(&self) -> bool {
        false
    }
}

impl<T: FileRenderer + ?Sized> FileRenderer for Box<T> {
    fn render(
        &self,
        path: &Path,
        variant: TemplateVariant,
        ctx: &TemplateContext,
    ) -> Result<bool, RenderError> {
        (**self).render(path, variant, ctx)
    }

    fn is_dry_run(&self) -> bool {
        (**self).is_dry_run()
    }
}

impl<T: FileRenderer + ?Sized> FileRenderer for &T {
    fn render(
        &self,
        path: &Path,
        variant: TemplateVariant,
        ctx: &TemplateContext,
    ) -> Result<bool, RenderError> {
        (**self).render(path, variant, ctx)
    }

    fn is_dry_run(&self) -> bool {
        (**self).is_dry_run()
    }
}

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteResult {
    /// Content changed or the file did not previously exist.
    Written { path: PathBuf },
    /// Content matched; only the mode or owner had drifted and was reset.
    PermissionsFixed { path: PathBuf },
    /// Content and mode already match.
    Unchanged { path: PathBuf },
    /// Dry run: the file *would* have been written or fixed.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn changed(&self) -> bool {
        !matches!(self, WriteResult::Unchanged { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::PermissionsFixed { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// DiskRenderer
// ---------------------------------------------------------------------------

/// [`FileRenderer`] that renders through the Tera engine and writes to disk.
#[derive(Debug)]
pub struct DiskRenderer {
    engine: TemplateEngine,
    root: Option<PathBuf>,
    owner: Option<(u32, u32)>,
    dry_run: bool,
}

impl DiskRenderer {
    /// Files end up owned by `root:root`.
    pub fn new(engine: TemplateEngine) -> Self {
        Self {
            engine,
            root: None,
            owner: Some((0, 0)),
            dry_run: false,
        }
    }

    /// Write under `root` instead of `/`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Keep whatever owner the writing process gives new files.
    pub fn without_ownership(mut self) -> Self {
        self.owner = None;
        self
    }

    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.owner = Some((uid, gid));
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Hash-gated atomic write of already rendered `content` to `path`
    /// (re-rooted if a root is set).
    pub fn write_rendered(&self, path: &Path, content: &str) -> Result<WriteResult, RenderError> {
        let target = rebase(self.root.as_deref(), path);
        let content = normalize_line_endings(content);
        let existing = read_existing(&target)?;

        if let Some(existing) = existing.as_deref() {
            if digest(existing) == digest(content.as_bytes()) {
                return self.reconcile_attributes(&target);
            }
        }

        if self.dry_run {
            let current = existing
                .as_deref()
                .map(String::from_utf8_lossy)
                .unwrap_or_default();
            let diff = TextDiff::from_lines(current.as_ref(), content.as_str())
                .unified_diff()
                .header("current", "rendered")
                .context_radius(3)
                .to_string();
            tracing::info!(path = %target.display(), "[dry-run] would write");
            tracing::debug!(path = %target.display(), "\n{diff}");
            return Ok(WriteResult::WouldWrite { path: target });
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let tmp = PathBuf::from(format!("{}.varnishlog.tmp", target.display()));
        if let Err(e) = self.write_tmp(&tmp, &content) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        if let Err(e) = std::fs::rename(&tmp, &target) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&target, e));
        }

        tracing::info!(path = %target.display(), "wrote");
        Ok(WriteResult::Written { path: target })
    }

    fn write_tmp(&self, tmp: &Path, content: &str) -> Result<(), RenderError> {
        std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;
        set_mode(tmp)?;
        if let Some((uid, gid)) = self.owner {
            set_owner(tmp, uid, gid)?;
        }
        Ok(())
    }

    fn reconcile_attributes(&self, target: &Path) -> Result<WriteResult, RenderError> {
        let mode_drift = mode_drifted(target)?;
        let owner_drift = match self.owner {
            Some((uid, gid)) => owner_drifted(target, uid, gid)?,
            None => false,
        };
        if !mode_drift && !owner_drift {
            tracing::debug!(path = %target.display(), "unchanged");
            return Ok(WriteResult::Unchanged {
                path: target.to_path_buf(),
            });
        }
        if self.dry_run {
            tracing::info!(
                path = %target.display(),
                mode_drift,
                owner_drift,
                "[dry-run] would reset permissions"
            );
            return Ok(WriteResult::WouldWrite {
                path: target.to_path_buf(),
            });
        }
        if mode_drift {
            set_mode(target)?;
        }
        if let (true, Some((uid, gid))) = (owner_drift, self.owner) {
            set_owner(target, uid, gid)?;
        }
        tracing::info!(path = %target.display(), mode_drift, owner_drift, "reset permissions");
        Ok(WriteResult::PermissionsFixed {
            path: target.to_path_buf(),
        })
    }
}

impl FileRenderer for DiskRenderer {
    fn render(
        &self,
        path: &Path,
        variant: TemplateVariant,
        ctx: &TemplateContext,
    ) -> Result<bool, RenderError> {
        let content = self.engine.render(variant, ctx)?;
        Ok(self.write_rendered(path, &content)?.changed())
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn digest(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Raw bytes on disk; a CRLF or non-UTF-8 file must not hash like the render.
fn read_existing(path: &Path) -> Result<Option<Vec<u8>>, RenderError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

#[cfg(unix)]
fn mode_drifted(path: &Path) -> Result<bool, RenderError> {
    use std::os::unix::fs::PermissionsExt;
    let meta = std::fs::metadata(path).map_err(|e| io_err(path, e))?;
    Ok(meta.permissions().mode() & 0o7777 != FILE_MODE)
}

#[cfg(not(unix))]
fn mode_drifted(_path: &Path) -> Result<bool, RenderError> {
    Ok(false)
}

#[cfg(unix)]
fn owner_drifted(path: &Path, uid: u32, gid: u32) -> Result<bool, RenderError> {
    use std::os::unix::fs::MetadataExt;
    let meta = std::fs::metadata(path).map_err(|e| io_err(path, e))?;
    Ok(meta.uid() != uid || meta.gid() != gid)
}

#[cfg(not(unix))]
fn owner_drifted(_path: &Path, _uid: u32, _gid: u32) -> Result<bool, RenderError> {
    Ok(false)
}

#[cfg(unix)]
fn set_mode(path: &Path) -> Result<(), RenderError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(FILE_MODE))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path) -> Result<(), RenderError> {
    Ok(())
}

#[cfg(unix)]
fn set_owner(path: &Path, uid: u32, gid: u32) -> Result<(), RenderError> {
    std::os::unix::fs::chown(path, Some(uid), Some(gid)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_owner(_path: &Path, _uid: u32, _gid: u32) -> Result<(), RenderError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex() {
        assert_eq!(digest(b"abc").len(), 64);
        assert_eq!(digest(b"abc"), digest(b"abc"));
        assert_ne!(digest(b"abc"), digest(b"abd"));
    }

    #[test]
    fn only_unchanged_is_not_a_change() {
        let p = PathBuf::from("/x");
        assert!(!WriteResult::Unchanged { path: p.clone() }.changed());
        assert!(WriteResult::Written { path: p.clone() }.changed());
        assert!(WriteResult::PermissionsFixed { path: p.clone() }.changed());
        assert!(WriteResult::WouldWrite { path: p }.changed());
    }
}
