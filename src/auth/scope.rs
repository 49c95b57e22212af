use super::{Role, Session};
use crate::entities::{client, end_client, project, project_member};
use sea_orm::sea_query::{ConditionalStatement, Expr, Query, SelectStatement};
use sea_orm::{ColumnTrait, Condition};

/// Row visibility of a caller, attached to every list query that touches
/// project-owned rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopePredicate {
    /// No filter.
    All,
    /// Projects whose end client belongs to a client owned by this user.
    ClientChain(i32),
    /// Projects the user is a member of.
    Members(i32),
    /// Nothing is visible.
    Deny,
}

impl ScopePredicate {
    /// Scope for ordinary reads and writes of project data.
    pub fn for_read(session: &Session) -> Self {
        match session.role {
            Role::Superadmin => ScopePredicate::All,
            Role::Admin => ScopePredicate::ClientChain(session.user_id),
            Role::Other(_) => ScopePredicate::Members(session.user_id),
        }
    }

    /// Scope for privileged aggregates such as invoices. Roles other than
    /// admin and superadmin see nothing.
    pub fn for_privileged(session: &Session) -> Self {
        match session.role {
            Role::Superadmin => ScopePredicate::All,
            Role::Admin => ScopePredicate::ClientChain(session.user_id),
            Role::Other(_) => ScopePredicate::Deny,
        }
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, ScopePredicate::Deny)
    }

    /// Renders the predicate against a column holding a project id.
    pub fn condition<C: ColumnTrait>(&self, project_col: C) -> Condition {
        match self {
            ScopePredicate::All => Condition::all(),
            ScopePredicate::Deny => Condition::all().add(Expr::val(1).eq(0)),
            ScopePredicate::ClientChain(user_id) => {
                Condition::all().add(project_col.in_subquery(client_chain_projects(*user_id)))
            }
            ScopePredicate::Members(user_id) => {
                Condition::all().add(project_col.in_subquery(member_projects(*user_id)))
            }
        }
    }
}

/// project -> end_client -> client -> owning user.
fn client_chain_projects(user_id: i32) -> SelectStatement {
    Query::select()
        .column((project::Entity, project::Column::ProjectId))
        .from(project::Entity)
        .inner_join(
            end_client::Entity,
            Expr::col((end_client::Entity, end_client::Column::Id))
                .equals((project::Entity, project::Column::ClientId)),
        )
        .inner_join(
            client::Entity,
            Expr::col((client::Entity, client::Column::ClientId))
                .equals((end_client::Entity, end_client::Column::ClientId)),
        )
        .and_where(Expr::col((client::Entity, client::Column::UserId)).eq(user_id))
        .to_owned()
}

fn member_projects(user_id: i32) -> SelectStatement {
    Query::select()
        .column(project_member::Column::ProjectId)
        .from(project_member::Entity)
        .and_where(Expr::col(project_member::Column::UserId).eq(user_id))
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::element_type;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    fn session(role: Role) -> Session {
        Session {
            user_id: 7,
            role,
            host_name: "host".into(),
            ip_address: "127.0.0.1".into(),
            display_name: "Test User".into(),
            email: "t@example.com".into(),
        }
    }

    #[test]
    fn role_maps_to_predicate() {
        assert_eq!(
            ScopePredicate::for_read(&session(Role::Superadmin)),
            ScopePredicate::All
        );
        assert_eq!(
            ScopePredicate::for_read(&session(Role::Admin)),
            ScopePredicate::ClientChain(7)
        );
        assert_eq!(
            ScopePredicate::for_read(&session(Role::Other("planner".into()))),
            ScopePredicate::Members(7)
        );
        assert!(ScopePredicate::for_privileged(&session(Role::Other("planner".into()))).is_deny());
    }

    #[test]
    fn client_chain_renders_as_subquery() {
        let sql = element_type::Entity::find()
            .filter(
                ScopePredicate::ClientChain(7).condition(element_type::Column::ProjectId),
            )
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("IN (SELECT"), "{sql}");
        assert!(sql.contains("\"user_id\" = 7"), "{sql}");
    }
}
