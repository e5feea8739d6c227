//! Host fact detection for `varnishlog-detector`.
//!
//! `detect_platform_at(root)` reads `<root>/etc/os-release` for the platform
//! family and `<root>/proc/1/comm` for the init system. `varnish_version()`
//! asks `varnishd -V`. Every reader has an `_at` form taking an explicit root
//! so tests (and image builds) never touch the real host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use varnishlog_core::PlatformContext;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Errors from host detection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no os-release file at {path}")]
    OsReleaseNotFound { path: PathBuf },

    #[error("os-release at {path} has no ID field")]
    MissingId { path: PathBuf },

    #[error("could not run {program}: {source}")]
    VarnishdUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not find a version in varnishd output: {output}")]
    UnparseableVersion { output: String },
}

/// Init system reported when PID 1 cannot be inspected.
pub const FALLBACK_INIT: &str = "init";

// ---------------------------------------------------------------------------
// Family table
// ---------------------------------------------------------------------------

/// os-release IDs grouped by platform family; checked against `ID` first and
/// then each `ID_LIKE` token in order.
const FAMILIES: &[(&str, &[&str])] = &[
    (
        "debian",
        &["debian", "ubuntu", "linuxmint", "raspbian", "pop", "elementary", "kali", "devuan"],
    ),
    (
        "rhel",
        &["rhel", "centos", "rocky", "almalinux", "ol", "scientific", "redhat", "cloudlinux"],
    ),
    ("fedora", &["fedora"]),
    ("amazon", &["amzn"]),
    (
        "suse",
        &["suse", "sles", "sled", "opensuse", "opensuse-leap", "opensuse-tumbleweed"],
    ),
    ("arch", &["arch", "manjaro", "endeavouros"]),
    ("alpine", &["alpine"]),
    ("gentoo", &["gentoo"]),
];

fn family_of(id: &str) -> Option<&'static str> {
    FAMILIES
        .iter()
        .find(|(_, ids)| ids.contains(&id))
        .map(|(family, _)| *family)
}

/// Map os-release `ID` / `ID_LIKE` to a platform family.
///
/// An unknown distribution falls back to its own `ID`.
pub fn family_for(id: &str, id_like: Option<&str>) -> String {
    if let Some(family) = family_of(id) {
        return family.to_owned();
    }
    id_like
        .into_iter()
        .flat_map(str::split_whitespace)
        .find_map(family_of)
        .unwrap_or(id)
        .to_owned()
}

// ---------------------------------------------------------------------------
// os-release
// ---------------------------------------------------------------------------

/// Parse `KEY=value` lines, stripping one level of single or double quotes.
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_owned(), unquote(value.trim()).to_owned()))
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// `<root>/etc/os-release`, falling back to `<root>/usr/lib/os-release`.
fn os_release_path(root: &Path) -> Option<PathBuf> {
    [
        root.join("etc").join("os-release"),
        root.join("usr").join("lib").join("os-release"),
    ]
    .into_iter()
    .find(|p| p.exists())
}

/// Platform family of the system rooted at `root`.
pub fn platform_family_at(root: &Path) -> Result<String, DetectError> {
    let path = os_release_path(root).ok_or_else(|| DetectError::OsReleaseNotFound {
        path: root.join("etc").join("os-release"),
    })?;
    let content = std::fs::read_to_string(&path).map_err(|e| DetectError::Io {
        path: path.clone(),
        source: e,
    })?;
    let fields = parse_os_release(&content);
    let id = fields
        .get("ID")
        .map(|s| s.to_lowercase())
        .ok_or(DetectError::MissingId { path })?;
    let id_like = fields.get("ID_LIKE").map(|s| s.to_lowercase());
    Ok(family_for(&id, id_like.as_deref()))
}

// ---------------------------------------------------------------------------
// Init system
// ---------------------------------------------------------------------------

/// Name of PID 1 (`systemd`, `init`, …) for the system rooted at `root`.
///
/// Never fails: an unreadable or empty `/proc/1/comm` yields [`FALLBACK_INIT`].
pub fn init_system_at(root: &Path) -> String {
    let path = root.join("proc").join("1").join("comm");
    match std::fs::read_to_string(&path) {
        Ok(comm) if !comm.trim().is_empty() => comm.trim().to_owned(),
        Ok(_) => FALLBACK_INIT.to_owned(),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "PID 1 not readable");
            FALLBACK_INIT.to_owned()
        }
    }
}

/// Both facts for the system rooted at `root`.
pub fn detect_platform_at(root: &Path) -> Result<PlatformContext, DetectError> {
    let platform = PlatformContext::new(platform_family_at(root)?, init_system_at(root));
    tracing::debug!(
        family = %platform.platform_family,
        init = %platform.init_system,
        root = %root.display(),
        "detected platform"
    );
    Ok(platform)
}

/// `detect_platform_at` convenience wrapper for the running host.
pub fn detect_platform() -> Result<PlatformContext, DetectError> {
    detect_platform_at(Path::new("/"))
}

// ---------------------------------------------------------------------------
// Varnish version
// ---------------------------------------------------------------------------

/// Extract `X.Y.Z` from `varnishd -V` output such as
/// `varnishd (varnish-6.0.11 revision a3bc025c2df28e4a76e10e2c41217c9864e9963b)`.
pub fn parse_varnish_version(output: &str) -> Option<String> {
    let (_, rest) = output.split_once("varnish-")?;
    let rest = rest.strip_prefix("plus-").unwrap_or(rest);
    let version: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let version = version.trim_end_matches('.');
    if version.is_empty() {
        None
    } else {
        Some(version.to_owned())
    }
}

/// Version of the installed varnishd, via `<program> -V`.
pub fn varnish_version_with(program: &str) -> Result<String, DetectError> {
    let output = Command::new(program)
        .arg("-V")
        .output()
        .map_err(|e| DetectError::VarnishdUnavailable {
            program: program.to_owned(),
            source: e,
        })?;
    // varnishd prints the banner on stderr.
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    parse_varnish_version(&text).ok_or_else(|| DetectError::UnparseableVersion {
        output: text.trim().to_owned(),
    })
}

/// `varnish_version_with("varnishd")`.
pub fn varnish_version() -> Result<String, DetectError> {
    varnish_version_with("varnishd")
}
