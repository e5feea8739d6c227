//! Retry guard around start/restart.
//!
//! varnishd and its logging companions (varnishlog, varnishncsa) race on
//! startup: the companion can fail to attach to the shared memory log while
//! varnishd is still coming up. [`GuardedServiceManager`] masks that by waiting
//! a fixed delay before **every** attempt for race-prone names and retrying
//! transient failures up to a fixed bound.
//!
//! ```text
//! Idle → Attempting(1) → Success
//!                      ↘ Attempting(2) → … → Attempting(max) → Success | Exhausted
//! ```
//!
//! The attempt counter lives on the stack of each call; the guard itself is
//! immutable, so one guard can serve concurrent calls for different services.

use std::time::Duration;

use crate::error::{LifecycleAction, ServiceError, ServiceLifecycleError};
use crate::manager::ServiceManager;

/// Total attempts per guarded call.
pub const MAX_ATTEMPTS: u32 = 5;

/// Wait before each attempt on a race-prone service.
pub const RACE_DELAY: Duration = Duration::from_secs(5);

/// Bounded attempts with a constant delay; no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RACE_DELAY,
        }
    }
}

/// Decides which service names are subject to the startup race.
///
/// A name is race-prone when it contains any of the patterns (unanchored).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceProneMatcher {
    patterns: Vec<String>,
}

impl RaceProneMatcher {
    pub fn new<I, P>(patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// `varnishlog` and `varnishncsa`, including suffixed unit names such as
    /// `varnishncsa@edge01`.
    pub fn varnish_logging() -> Self {
        Self::new(["varnishlog", "varnishncsa"])
    }

    /// Matches nothing: bounded retries without any delay.
    pub fn none() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn is_race_prone(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| name.contains(p.as_str()))
    }
}

impl Default for RaceProneMatcher {
    fn default() -> Self {
        Self::varnish_logging()
    }
}

/// Blocking wait used between attempts; swapped out in tests.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Any [`ServiceManager`] with start/restart wrapped in the retry guard.
///
/// `enable`, `reload` and the state queries pass straight through.
#[derive(Debug, Clone)]
pub struct GuardedServiceManager<M, S = ThreadSleeper> {
    inner: M,
    policy: RetryPolicy,
    matcher: RaceProneMatcher,
    sleeper: S,
}

impl<M: ServiceManager> GuardedServiceManager<M> {
    /// Guard `inner` with the default policy (5 attempts, 5 s) and the
    /// varnish logging matcher.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
            matcher: RaceProneMatcher::default(),
            sleeper: ThreadSleeper,
        }
    }
}

impl<M: ServiceManager, S: Sleeper> GuardedServiceManager<M, S> {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_matcher(mut self, matcher: RaceProneMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> GuardedServiceManager<M, T> {
        GuardedServiceManager {
            inner: self.inner,
            policy: self.policy,
            matcher: self.matcher,
            sleeper,
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn is_race_prone(&self, name: &str) -> bool {
        self.matcher.is_race_prone(name)
    }

    pub fn guarded_start(&self, name: &str) -> Result<(), ServiceLifecycleError> {
        self.guarded(name, LifecycleAction::Start)
    }

    pub fn guarded_restart(&self, name: &str) -> Result<(), ServiceLifecycleError> {
        self.guarded(name, LifecycleAction::Restart)
    }

    pub fn enable(&self, name: &str) -> Result<(), ServiceError> {
        self.inner.enable(name)
    }

    pub fn reload(&self, name: &str) -> Result<(), ServiceError> {
        self.inner.reload(name)
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool, ServiceError> {
        self.inner.is_enabled(name)
    }

    pub fn is_active(&self, name: &str) -> Result<bool, ServiceError> {
        self.inner.is_active(name)
    }

    fn invoke(&self, name: &str, action: LifecycleAction) -> Result<(), ServiceError> {
        match action {
            LifecycleAction::Start => self.inner.start(name),
            LifecycleAction::Restart => self.inner.restart(name),
        }
    }

    fn guarded(&self, name: &str, action: LifecycleAction) -> Result<(), ServiceLifecycleError> {
        let race_prone = self.matcher.is_race_prone(name);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if race_prone {
                tracing::debug!(
                    service = %name,
                    %action,
                    attempt,
                    delay_ms = self.policy.delay.as_millis() as u64,
                    "waiting out varnishd startup race"
                );
                self.sleeper.sleep(self.policy.delay);
            }

            let err = match self.invoke(name, action) {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::info!(service = %name, %action, attempt, "succeeded after retry");
                    }
                    return Ok(());
                }
                Err(err) => err,
            };

            if !err.is_transient() || attempt >= max_attempts {
                tracing::error!(
                    service = %name,
                    %action,
                    attempts = attempt,
                    error = %err,
                    "giving up"
                );
                return Err(ServiceLifecycleError {
                    service_name: name.to_owned(),
                    action,
                    attempts: attempt,
                    last_error: err,
                });
            }

            tracing::warn!(
                service = %name,
                %action,
                attempt,
                max_attempts,
                kind = self.inner.kind(),
                error = %err,
                "attempt failed, retrying"
            );
            attempt += 1;
        }
    }
}
