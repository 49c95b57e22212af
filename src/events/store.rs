use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::ActivityEvent;
use crate::db::DbPool;
use crate::entities::{activity_log, client, end_client, notification, project, project_member};
use crate::errors::ServiceError;

/// Insert-only sink for audit rows and notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_activity_log(&self, event: &ActivityEvent) -> Result<i32, ServiceError>;

    /// Users linked to a project: members, the owning client's user and the
    /// end client's contact.
    async fn recipients(&self, project_id: i32) -> Result<Vec<i32>, ServiceError>;

    async fn insert_notifications(
        &self,
        user_ids: &[i32],
        message: &str,
        project_id: Option<i32>,
    ) -> Result<usize, ServiceError>;
}

pub struct SeaOrmAuditStore {
    db: Arc<DbPool>,
}

impl SeaOrmAuditStore {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditStore for SeaOrmAuditStore {
    async fn insert_activity_log(&self, event: &ActivityEvent) -> Result<i32, ServiceError> {
        let row = activity_log::ActiveModel {
            event_context: Set(event.event_context.clone()),
            event_name: Set(event.event_name.clone()),
            description: Set(event.description.clone()),
            user_name: Set(event.user_name.clone()),
            host_name: Set(event.host_name.clone()),
            ip_address: Set(event.ip_address.clone()),
            project_id: Set(event.project_id),
            created_at: Set(event.created_at),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;
        Ok(row.id)
    }

    async fn recipients(&self, project_id: i32) -> Result<Vec<i32>, ServiceError> {
        let db = self.db.as_ref();
        let mut users: BTreeSet<i32> = project_member::Entity::find()
            .select_only()
            .column(project_member::Column::UserId)
            .filter(project_member::Column::ProjectId.eq(project_id))
            .into_tuple::<i32>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        if let Some(proj) = project::Entity::find_by_id(project_id).one(db).await? {
            if let Some(end) = end_client::Entity::find_by_id(proj.client_id).one(db).await? {
                if let Some(contact) = end.user_id {
                    users.insert(contact);
                }
                if let Some(owner) = client::Entity::find_by_id(end.client_id).one(db).await? {
                    users.insert(owner.user_id);
                }
            }
        }

        Ok(users.into_iter().collect())
    }

    async fn insert_notifications(
        &self,
        user_ids: &[i32],
        message: &str,
        project_id: Option<i32>,
    ) -> Result<usize, ServiceError> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let now = chrono::Utc::now();
        let rows = user_ids.iter().map(|uid| notification::ActiveModel {
            user_id: Set(*uid),
            message: Set(message.to_string()),
            project_id: Set(project_id),
            read: Set(false),
            created_at: Set(now),
            ..Default::default()
        });
        notification::Entity::insert_many(rows)
            .exec(self.db.as_ref())
            .await?;
        Ok(user_ids.len())
    }
}
