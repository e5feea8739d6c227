//! Delayed service notifications collected during one convergence run.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyAction {
    Restart,
}

/// When a notification fires. Only delayed edges exist: they run after every
/// other step of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyTiming {
    Delayed,
}

/// "This service must be acted on because something it reads changed."
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NotificationEdge {
    pub target_service: String,
    pub action: NotifyAction,
    pub timing: NotifyTiming,
}

impl NotificationEdge {
    pub fn delayed_restart(service: impl Into<String>) -> Self {
        Self {
            target_service: service.into(),
            action: NotifyAction::Restart,
            timing: NotifyTiming::Delayed,
        }
    }
}

/// Ordered set of pending edges; registering an identical edge twice keeps one.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    edges: Vec<NotificationEdge>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `edge`. Returns `false` when it coalesced into an existing one.
    pub fn notify(&mut self, edge: NotificationEdge) -> bool {
        if self.edges.contains(&edge) {
            tracing::debug!(service = %edge.target_service, "notification coalesced");
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Take every pending edge in registration order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, NotificationEdge> {
        self.edges.drain(..)
    }
}
