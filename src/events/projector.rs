use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{ActivityEvent, AuditStore};

/// Single consumer of the activity channel.
pub struct ActivityProjector<S: AuditStore + ?Sized> {
    store: Arc<S>,
}

impl<S: AuditStore + ?Sized> ActivityProjector<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Drains the channel until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<ActivityEvent>) {
        info!("Starting activity projector");
        while let Some(event) = rx.recv().await {
            self.project(&event).await;
        }
        info!("Activity projector stopped");
    }

    /// Writes one event. Returns whether everything was recorded; failures
    /// are logged and counted only.
    pub async fn project(&self, event: &ActivityEvent) -> bool {
        let mut ok = true;

        match self.store.insert_activity_log(event).await {
            Ok(id) => debug!(log_id = id, event = %event.event_name, "activity recorded"),
            Err(e) => {
                ok = false;
                error!(event = %event.event_name, error = %e, "failed to record activity");
                metrics::counter!("precast.activity.log_failed", 1);
            }
        }

        if !event.notify {
            return ok;
        }
        let Some(project_id) = event.project_id else {
            return ok;
        };

        let recipients = match self.store.recipients(project_id).await {
            Ok(r) => r,
            Err(e) => {
                error!(project_id, error = %e, "failed to resolve notification recipients");
                metrics::counter!("precast.activity.notify_failed", 1);
                return false;
            }
        };

        let message = format!("{}: {}", event.user_name, event.description);
        if let Err(e) = self
            .store
            .insert_notifications(&recipients, &message, event.project_id)
            .await
        {
            ok = false;
            error!(project_id, error = %e, "failed to insert notifications");
            metrics::counter!("precast.activity.notify_failed", 1);
        }

        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;
    use crate::events::store::MockAuditStore;
    use chrono::Utc;
    use mockall::predicate::*;

    fn event(project_id: Option<i32>, notify: bool) -> ActivityEvent {
        ActivityEvent {
            event_context: "element_type".into(),
            event_name: "update".into(),
            description: "updated WALL".into(),
            user_id: 3,
            user_name: "Ada Admin".into(),
            host_name: "h".into(),
            ip_address: "10.0.0.1".into(),
            project_id,
            created_at: Utc::now(),
            notify,
        }
    }

    #[tokio::test]
    async fn fans_out_to_recipients() {
        let mut store = MockAuditStore::new();
        store.expect_insert_activity_log().times(1).returning(|_| Ok(1));
        store
            .expect_recipients()
            .with(eq(9))
            .times(1)
            .returning(|_| Ok(vec![4, 5]));
        store
            .expect_insert_notifications()
            .withf(|users, msg, project| {
                users.to_vec() == vec![4, 5] && msg.contains("updated WALL") && *project == Some(9)
            })
            .times(1)
            .returning(|users, _, _| Ok(users.len()));

        let projector = ActivityProjector::new(Arc::new(store));
        assert!(projector.project(&event(Some(9), true)).await);
    }

    #[tokio::test]
    async fn audit_failure_is_swallowed() {
        let mut store = MockAuditStore::new();
        store
            .expect_insert_activity_log()
            .returning(|_| Err(ServiceError::InternalError("disk full".into())));
        store.expect_recipients().returning(|_| Ok(vec![4]));
        store
            .expect_insert_notifications()
            .returning(|_, _, _| Err(ServiceError::InternalError("down".into())));

        let projector = ActivityProjector::new(Arc::new(store));
        assert!(!projector.project(&event(Some(9), true)).await);
    }

    #[tokio::test]
    async fn silent_events_skip_notifications() {
        let mut store = MockAuditStore::new();
        store.expect_insert_activity_log().times(1).returning(|_| Ok(1));
        store.expect_recipients().never();
        store.expect_insert_notifications().never();

        let projector = ActivityProjector::new(Arc::new(store));
        assert!(projector.project(&event(Some(9), false)).await);
    }

    #[tokio::test]
    async fn run_drains_until_senders_drop() {
        let mut store = MockAuditStore::new();
        store.expect_insert_activity_log().times(2).returning(|_| Ok(1));

        let (tx, rx) = mpsc::channel(4);
        tx.send(event(None, true)).await.unwrap();
        tx.send(event(None, true)).await.unwrap();
        drop(tx);

        ActivityProjector::new(Arc::new(store)).run(rx).await;
    }
}
