//! Post-commit activity events.
//!
//! Services publish an [`ActivityEvent`] after their transaction commits.
//! A single [`ActivityProjector`] drains the channel and writes the audit row
//! and notifications; nothing it does can roll back the mutation.

pub mod projector;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

use crate::auth::Session;

pub use projector::ActivityProjector;
pub use store::{AuditStore, SeaOrmAuditStore};

/// One audit record plus the notification intent derived from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub event_context: String,
    pub event_name: String,
    pub description: String,
    pub user_id: i32,
    pub user_name: String,
    pub host_name: String,
    pub ip_address: String,
    pub project_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    /// Fan out in-app notifications to the project audience.
    pub notify: bool,
}

impl ActivityEvent {
    pub fn new(
        session: &Session,
        event_context: &str,
        event_name: &str,
        description: impl Into<String>,
        project_id: Option<i32>,
    ) -> Self {
        Self {
            event_context: event_context.to_string(),
            event_name: event_name.to_string(),
            description: description.into(),
            user_id: session.user_id,
            user_name: session.display_name.clone(),
            host_name: session.host_name.clone(),
            ip_address: session.ip_address.clone(),
            project_id,
            created_at: Utc::now(),
            notify: true,
        }
    }

    pub fn without_notification(mut self) -> Self {
        self.notify = false;
        self
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("activity channel is full")]
    Full,
    #[error("activity projector has stopped")]
    Closed,
}

/// Producer half of the activity channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<ActivityEvent>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<ActivityEvent>) -> Self {
        Self { sender }
    }

    /// Enqueues without waiting. Callers are past their commit and must not
    /// block on the projector.
    pub fn send(&self, event: ActivityEvent) -> Result<(), EventError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EventError::Full,
            mpsc::error::TrySendError::Closed(_) => EventError::Closed,
        })
    }

    /// Enqueues and turns a failure into a client-facing warning.
    pub fn send_or_warn(&self, event: ActivityEvent) -> Option<String> {
        let name = event.event_name.clone();
        match self.send(event) {
            Ok(()) => None,
            Err(e) => {
                warn!(event = %name, error = %e, "activity event dropped");
                metrics::counter!("precast.activity.enqueue_failed", 1);
                Some(format!("activity log not recorded: {}", e))
            }
        }
    }

    /// Free slots and total capacity of the channel.
    pub fn headroom(&self) -> (usize, usize) {
        (self.sender.capacity(), self.sender.max_capacity())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Creates a bounded activity channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<ActivityEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn session() -> Session {
        Session {
            user_id: 1,
            role: Role::Admin,
            host_name: "h".into(),
            ip_address: "10.0.0.1".into(),
            display_name: "Ada Admin".into(),
            email: "ada@example.com".into(),
        }
    }

    #[tokio::test]
    async fn full_channel_becomes_a_warning() {
        let (sender, mut rx) = channel(1);
        let ev = ActivityEvent::new(&session(), "element_type", "create", "x", Some(1));
        assert!(sender.send_or_warn(ev.clone()).is_none());
        let warning = sender.send_or_warn(ev.clone());
        assert!(warning.unwrap().contains("full"));
        assert_eq!(rx.recv().await.unwrap().event_name, "create");
    }

    #[tokio::test]
    async fn closed_channel_becomes_a_warning() {
        let (sender, rx) = channel(4);
        drop(rx);
        let ev = ActivityEvent::new(&session(), "element_type", "update", "x", None);
        assert!(sender.send_or_warn(ev).unwrap().contains("stopped"));
    }
}
