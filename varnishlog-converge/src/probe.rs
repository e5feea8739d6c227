//! Filesystem existence checks, optionally re-rooted.

use std::path::{Path, PathBuf};

/// Answers "does this path exist on the target host".
pub trait FileSystemProbe: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

impl<T: FileSystemProbe + ?Sized> FileSystemProbe for Box<T> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

impl<T: FileSystemProbe + ?Sized> FileSystemProbe for &T {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
}

/// Re-root an absolute host path under `root`; `None` leaves it untouched.
pub fn rebase(root: Option<&Path>, path: &Path) -> PathBuf {
    match root {
        Some(root) => root.join(path.strip_prefix("/").unwrap_or(path)),
        None => path.to_path_buf(),
    }
}

/// [`FileSystemProbe`] backed by `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct StdFsProbe {
    root: Option<PathBuf>,
}

impl StdFsProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe paths under `root` instead of `/`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl FileSystemProbe for StdFsProbe {
    fn exists(&self, path: &Path) -> bool {
        rebase(self.root.as_deref(), path).exists()
    }
}
