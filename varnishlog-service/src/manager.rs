//! The service-manager capability set.

use varnishlog_core::PlatformContext;

use crate::error::ServiceError;
use crate::init_script::InitScriptManager;
use crate::systemd::SystemdManager;

/// Lifecycle primitives of an OS service manager.
///
/// Implementations must be idempotent for `enable`; `start`/`restart`/`reload`
/// report failures as [`ServiceError`] and leave retrying to the caller.
pub trait ServiceManager: Send + Sync {
    /// Short label for logs (`systemd`, `init`).
    fn kind(&self) -> &'static str;

    fn enable(&self, name: &str) -> Result<(), ServiceError>;
    fn start(&self, name: &str) -> Result<(), ServiceError>;
    fn restart(&self, name: &str) -> Result<(), ServiceError>;
    fn reload(&self, name: &str) -> Result<(), ServiceError>;

    /// Whether the service starts at boot.
    fn is_enabled(&self, name: &str) -> Result<bool, ServiceError>;
    /// Whether the service is currently running.
    fn is_active(&self, name: &str) -> Result<bool, ServiceError>;
}

impl<T: ServiceManager + ?Sized> ServiceManager for Box<T> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }
    fn enable(&self, name: &str) -> Result<(), ServiceError> {
        (**self).enable(name)
    }
    fn start(&self, name: &str) -> Result<(), ServiceError> {
        (**self).start(name)
    }
    fn restart(&self, name: &str) -> Result<(), ServiceError> {
        (**self).restart(name)
    }
    fn reload(&self, name: &str) -> Result<(), ServiceError> {
        (**self).reload(name)
    }
    fn is_enabled(&self, name: &str) -> Result<bool, ServiceError> {
        (**self).is_enabled(name)
    }
    fn is_active(&self, name: &str) -> Result<bool, ServiceError> {
        (**self).is_active(name)
    }
}

impl<T: ServiceManager + ?Sized> ServiceManager for &T {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }
    fn enable(&self, name: &str) -> Result<(), ServiceError> {
        (**self).enable(name)
    }
    fn start(&self, name: &str) -> Result<(), ServiceError> {
        (**self).start(name)
    }
    fn restart(&self, name: &str) -> Result<(), ServiceError> {
        (**self).restart(name)
    }
    fn reload(&self, name: &str) -> Result<(), ServiceError> {
        (**self).reload(name)
    }
    fn is_enabled(&self, name: &str) -> Result<bool, ServiceError> {
        (**self).is_enabled(name)
    }
    fn is_active(&self, name: &str) -> Result<bool, ServiceError> {
        (**self).is_active(name)
    }
}

/// Pick the manager variant matching the host's init system.
pub fn manager_for(platform: &PlatformContext) -> Box<dyn ServiceManager> {
    if platform.is_systemd() {
        Box::new(SystemdManager::new())
    } else {
        Box::new(InitScriptManager::for_platform(platform))
    }
}

/// Reject names that would be misread by the underlying tools.
pub fn validate_service_name(name: &str) -> Result<(), ServiceError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.starts_with('-') {
        Some("name starts with '-'")
    } else if name.contains('/') {
        Some("name contains '/'")
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("name contains whitespace or control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ServiceError::InvalidName {
            name: name.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}
