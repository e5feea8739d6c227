//! SysV init-script manager (`/etc/init.d/<name>`).

use std::path::{Path, PathBuf};

use varnishlog_core::PlatformContext;

use crate::command::{run_checked, run_query};
use crate::error::{io_err, ServiceError};
use crate::manager::{validate_service_name, ServiceManager};

/// Runlevels checked for a start link when `update-rc.d` manages boot order.
const RUNLEVELS: [u8; 4] = [2, 3, 4, 5];

/// How boot-time enablement is recorded on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitEnabler {
    /// Debian family: `update-rc.d <name> defaults`, state read from rc links.
    UpdateRcD { program: PathBuf },
    /// Red Hat family and others: `chkconfig <name> on` / `chkconfig <name>`.
    Chkconfig { program: PathBuf },
}

/// Drives services through their init scripts.
#[derive(Debug, Clone)]
pub struct InitScriptManager {
    init_dir: PathBuf,
    rc_root: PathBuf,
    enabler: InitEnabler,
}

impl InitScriptManager {
    pub fn new(enabler: InitEnabler) -> Self {
        Self {
            init_dir: PathBuf::from("/etc/init.d"),
            rc_root: PathBuf::from("/etc"),
            enabler,
        }
    }

    /// `update-rc.d` on the Debian family, `chkconfig` elsewhere.
    pub fn for_platform(platform: &PlatformContext) -> Self {
        let enabler = if platform.is_debian_family() {
            InitEnabler::UpdateRcD {
                program: PathBuf::from("update-rc.d"),
            }
        } else {
            InitEnabler::Chkconfig {
                program: PathBuf::from("chkconfig"),
            }
        };
        Self::new(enabler)
    }

    /// Override where init scripts and `rc?.d` directories live.
    pub fn with_dirs(mut self, init_dir: impl Into<PathBuf>, rc_root: impl Into<PathBuf>) -> Self {
        self.init_dir = init_dir.into();
        self.rc_root = rc_root.into();
        self
    }

    pub fn enabler(&self) -> &InitEnabler {
        &self.enabler
    }

    fn script(&self, name: &str) -> Result<PathBuf, ServiceError> {
        validate_service_name(name)?;
        Ok(self.init_dir.join(name))
    }

    fn act(&self, verb: &str, name: &str) -> Result<(), ServiceError> {
        let script = self.script(name)?;
        run_checked(&script, &[verb])
    }

    fn has_start_link(&self, name: &str) -> Result<bool, ServiceError> {
        for level in RUNLEVELS {
            let dir = self.rc_root.join(format!("rc{level}.d"));
            if has_start_link_in(&dir, name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// `S<NN><name>` inside `dir`; a missing directory counts as "no link".
fn has_start_link_in(dir: &Path, name: &str) -> Result<bool, ServiceError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(io_err(dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        let Some(rest) = file_name.strip_prefix('S') else {
            continue;
        };
        let link_target = rest.trim_start_matches(|c: char| c.is_ascii_digit());
        if link_target.len() < rest.len() && link_target == name {
            return Ok(true);
        }
    }
    Ok(false)
}

impl ServiceManager for InitScriptManager {
    fn kind(&self) -> &'static str {
        "init"
    }

    fn enable(&self, name: &str) -> Result<(), ServiceError> {
        validate_service_name(name)?;
        match &self.enabler {
            InitEnabler::UpdateRcD { program } => run_checked(program, &[name, "defaults"]),
            InitEnabler::Chkconfig { program } => run_checked(program, &[name, "on"]),
        }
    }

    fn start(&self, name: &str) -> Result<(), ServiceError> {
        self.act("start", name)
    }

    fn restart(&self, name: &str) -> Result<(), ServiceError> {
        self.act("restart", name)
    }

    fn reload(&self, name: &str) -> Result<(), ServiceError> {
        self.act("reload", name)
    }

    fn is_enabled(&self, name: &str) -> Result<bool, ServiceError> {
        validate_service_name(name)?;
        match &self.enabler {
            InitEnabler::UpdateRcD { .. } => self.has_start_link(name),
            InitEnabler::Chkconfig { program } => run_query(program, &[name]),
        }
    }

    fn is_active(&self, name: &str) -> Result<bool, ServiceError> {
        let script = self.script(name)?;
        if !script.exists() {
            return Ok(false);
        }
        run_query(&script, &["status"])
    }
}
