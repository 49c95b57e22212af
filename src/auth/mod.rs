//! Identity gate: resolves the opaque session token sent in the
//! `Authorization` header into a caller identity and role scope.

pub mod scope;

use crate::db::{Deadlines, DbPool};
use crate::entities::{project, role, session, user};
use crate::errors::ServiceError;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub use scope::ScopePredicate;

/// Role as far as row visibility is concerned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Role {
    Superadmin,
    Admin,
    Other(String),
}

impl Role {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "superadmin" => Role::Superadmin,
            "admin" => Role::Admin,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Other(name) => name,
        }
    }
}

/// Resolved caller. Stamped on audit rows and used to scope reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: i32,
    pub role: Role,
    pub host_name: String,
    pub ip_address: String,
    pub display_name: String,
    pub email: String,
}

impl Session {
    pub fn read_scope(&self) -> ScopePredicate {
        ScopePredicate::for_read(self)
    }

    pub fn privileged_scope(&self) -> ScopePredicate {
        ScopePredicate::for_privileged(self)
    }
}

/// Strips an optional `Bearer ` prefix and surrounding whitespace.
pub fn extract_token(header_value: &str) -> Option<&str> {
    let trimmed = header_value.trim();
    if trimmed.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .unwrap_or(trimmed)
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Session lookups against the `sessions`, `users` and `roles` tables.
#[derive(Clone)]
pub struct IdentityGate {
    db: Arc<DbPool>,
    deadlines: Deadlines,
    session_ttl: ChronoDuration,
}

impl IdentityGate {
    pub fn new(db: Arc<DbPool>, deadlines: Deadlines, session_ttl_secs: u64) -> Self {
        Self {
            db,
            deadlines,
            session_ttl: ChronoDuration::seconds(session_ttl_secs as i64),
        }
    }

    /// Resolves a token. Missing, unknown and expired sessions are all
    /// `Unauthorized`.
    #[instrument(skip(self, token))]
    pub async fn resolve(&self, token: &str) -> Result<Session, ServiceError> {
        let db = self.db.as_ref();
        let token = token.to_string();
        let ttl = self.session_ttl;

        self.deadlines
            .run_fast("resolve_session", async move {
                let sess = session::Entity::find_by_id(token)
                    .one(db)
                    .await?
                    .ok_or_else(|| ServiceError::Unauthorized("unknown session".into()))?;

                let now = Utc::now();
                let expired = match sess.expires_at {
                    Some(exp) => exp <= now,
                    None => sess.created_at + ttl <= now,
                };
                if expired {
                    debug!(user_id = sess.user_id, "session expired");
                    return Err(ServiceError::Unauthorized("session expired".into()));
                }

                let (usr, rl) = user::Entity::find_by_id(sess.user_id)
                    .find_also_related(role::Entity)
                    .one(db)
                    .await?
                    .ok_or_else(|| ServiceError::Unauthorized("session user missing".into()))?;

                let role = match rl {
                    Some(r) => Role::from_name(&r.role_name),
                    None => {
                        warn!(user_id = usr.id, role_id = usr.role_id, "user has no role row");
                        Role::Other(String::new())
                    }
                };

                Ok(Session {
                    user_id: usr.id,
                    role,
                    host_name: sess.host_name,
                    ip_address: sess.ip_address,
                    display_name: format!("{} {}", usr.first_name, usr.last_name)
                        .trim()
                        .to_string(),
                    email: usr.email,
                })
            })
            .await
    }

    /// Fails with `Forbidden` unless the project is visible to the caller.
    /// A project that does not exist at all is `NotFound`.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn ensure_project_access(
        &self,
        session: &Session,
        project_id: i32,
    ) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        let scope = session.read_scope();
        self.deadlines
            .run_fast("project_access", check_project_access(db, &scope, project_id))
            .await
    }
}

/// Project visibility check usable inside a caller's transaction.
pub async fn check_project_access<C: ConnectionTrait>(
    conn: &C,
    scope: &ScopePredicate,
    project_id: i32,
) -> Result<(), ServiceError> {
    let exists = project::Entity::find_by_id(project_id).one(conn).await?;
    if exists.is_none() {
        return Err(ServiceError::not_found("project", project_id));
    }
    if matches!(scope, ScopePredicate::All) {
        return Ok(());
    }
    let visible = project::Entity::find()
        .filter(project::Column::ProjectId.eq(project_id))
        .filter(scope.condition(project::Column::ProjectId))
        .count(conn)
        .await?;
    if visible == 0 {
        Err(ServiceError::Forbidden(format!(
            "no access to project {}",
            project_id
        )))
    } else {
        Ok(())
    }
}

/// Extractor that resolves the `Authorization` header of every core
/// endpoint.
#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    crate::AppState: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_token)
            .ok_or_else(|| ServiceError::Unauthorized("missing session header".into()))?
            .to_string();

        let app = crate::AppState::from_ref(state);
        let session = app.services.identity.resolve(&token).await?;
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_extraction_accepts_bare_and_bearer() {
        assert_eq!(extract_token("abc"), Some("abc"));
        assert_eq!(extract_token("Bearer abc "), Some("abc"));
        assert_eq!(extract_token("bearer abc"), Some("abc"));
        assert_eq!(extract_token("Bearer "), None);
        assert_eq!(extract_token("   "), None);
    }

    #[test]
    fn role_names_are_case_insensitive() {
        assert_eq!(Role::from_name("SuperAdmin"), Role::Superadmin);
        assert_eq!(Role::from_name("admin"), Role::Admin);
        assert_eq!(Role::from_name("Planner"), Role::Other("planner".into()));
        assert_eq!(Role::Other("planner".into()).name(), "planner");
    }
}
