//! Service lifecycle for the varnish logging companions.
//!
//! - [`ServiceManager`]: capability set {enable, start, restart, reload} plus
//!   state queries, implemented by [`SystemdManager`] and [`InitScriptManager`].
//! - [`GuardedServiceManager`]: composes around any manager and retries
//!   start/restart through the varnishd startup race.

mod command;
mod error;
pub mod guard;
pub mod init_script;
pub mod manager;
pub mod systemd;

pub use error::{LifecycleAction, ServiceError, ServiceLifecycleError};
pub use guard::{
    GuardedServiceManager, RaceProneMatcher, RetryPolicy, Sleeper, ThreadSleeper, MAX_ATTEMPTS,
    RACE_DELAY,
};
pub use init_script::{InitEnabler, InitScriptManager};
pub use manager::{manager_for, validate_service_name, ServiceManager};
pub use systemd::SystemdManager;
