//! Element instance ledger: creation, removal, tombstoning and revision
//! pinning of the physical elements of a type.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::auth::{check_project_access, Session};
use crate::db::{require, Deadlines, DbPool};
use crate::entities::{
    activity, complete_production, element, element_invoice_history, element_type, precast_stock,
};
use crate::errors::ServiceError;
use crate::models::hierarchy::{element_name, next_seq};

/// Elements removed by a quantity decrease.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Removal {
    /// Unreferenced elements that were deleted outright.
    pub deleted: Vec<i32>,
    /// Elements with history that were tombstoned instead.
    pub disabled: Vec<i32>,
}

impl Removal {
    pub fn extend(&mut self, other: Removal) {
        self.deleted.extend(other.deleted);
        self.disabled.extend(other.disabled);
    }
}

/// Inserts `count` fresh elements of the type at one location. Names
/// continue after the highest sequence number used at that location,
/// tombstoned elements included.
#[instrument(skip(conn, et, naming_convention), fields(element_type_id = et.element_type_id))]
pub async fn materialize<C: ConnectionTrait>(
    conn: &C,
    et: &element_type::Model,
    hierarchy_id: i32,
    naming_convention: &str,
    count: u32,
    actor: i32,
) -> Result<Vec<i32>, ServiceError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let names: Vec<String> = element::Entity::find()
        .select_only()
        .column(element::Column::ElementName)
        .filter(element::Column::ElementTypeId.eq(et.element_type_id))
        .filter(element::Column::TargetLocation.eq(hierarchy_id))
        .into_tuple::<String>()
        .all(conn)
        .await?;
    let first = next_seq(names.iter().map(String::as_str));

    let now = Utc::now();
    let mut ids = Vec::with_capacity(count as usize);
    for seq in first..first + u64::from(count) {
        let row = element::ActiveModel {
            element_type_id: Set(et.element_type_id),
            project_id: Set(et.project_id),
            element_name: Set(element_name(naming_convention, seq)),
            target_location: Set(hierarchy_id),
            in_stage: Set(false),
            disabled: Set(false),
            element_type_version: Set(et.element_type_version.clone()),
            drawing_revision_id: Set(None),
            bom_revision_id: Set(None),
            created_by: Set(actor),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        ids.push(row.id);
    }
    debug!(hierarchy_id, created = ids.len(), "elements materialised");
    Ok(ids)
}

/// True when any history row points at the element.
pub async fn is_referenced<C: ConnectionTrait>(conn: &C, element_id: i32) -> Result<bool, ServiceError> {
    let activities = activity::Entity::find()
        .filter(activity::Column::ElementId.eq(element_id))
        .count(conn)
        .await?;
    if activities > 0 {
        return Ok(true);
    }
    let produced = complete_production::Entity::find()
        .filter(complete_production::Column::ElementId.eq(element_id))
        .count(conn)
        .await?;
    if produced > 0 {
        return Ok(true);
    }
    let invoiced = element_invoice_history::Entity::find()
        .filter(element_invoice_history::Column::ElementId.eq(element_id))
        .count(conn)
        .await?;
    if invoiced > 0 {
        return Ok(true);
    }
    let stocked = precast_stock::Entity::find()
        .filter(precast_stock::Column::ElementId.eq(element_id))
        .count(conn)
        .await?;
    Ok(stocked > 0)
}

/// Removes the `count` newest enabled elements at `(type, location)`.
/// Elements with history are tombstoned, the rest are deleted.
#[instrument(skip(conn))]
pub async fn remove_newest<C: ConnectionTrait>(
    conn: &C,
    element_type_id: i32,
    hierarchy_id: i32,
    count: u32,
) -> Result<Removal, ServiceError> {
    let victims = element::Entity::find()
        .filter(element::Column::ElementTypeId.eq(element_type_id))
        .filter(element::Column::TargetLocation.eq(hierarchy_id))
        .filter(element::Column::Disabled.eq(false))
        .order_by_desc(element::Column::Id)
        .limit(u64::from(count))
        .all(conn)
        .await?;

    let mut removal = Removal::default();
    for victim in victims {
        if is_referenced(conn, victim.id).await? {
            tombstone(conn, &[victim.id]).await?;
            removal.disabled.push(victim.id);
        } else {
            element::Entity::delete_by_id(victim.id).exec(conn).await?;
            removal.deleted.push(victim.id);
        }
    }
    Ok(removal)
}

/// Sets `disabled` on the given elements.
pub async fn tombstone<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> Result<u64, ServiceError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let res = element::Entity::update_many()
        .col_expr(element::Column::Disabled, Expr::value(true))
        .col_expr(element::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(element::Column::Id.is_in(ids.to_vec()))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

/// Newest activity row per element, keyed by element id.
pub async fn latest_activities<C: ConnectionTrait>(
    conn: &C,
    element_ids: &[i32],
) -> Result<HashMap<i32, activity::Model>, ServiceError> {
    if element_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = activity::Entity::find()
        .filter(activity::Column::ElementId.is_in(element_ids.to_vec()))
        .order_by_asc(activity::Column::Id)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|a| (a.element_id, a)).collect())
}

/// Tombstones enabled in-stage elements whose production is over or never
/// got an activity. Elements with an open activity are left for the reset.
#[instrument(skip(conn))]
pub async fn disable_finished<C: ConnectionTrait>(
    conn: &C,
    element_type_id: i32,
) -> Result<Vec<i32>, ServiceError> {
    let in_stage: Vec<element::Model> = element::Entity::find()
        .filter(element::Column::ElementTypeId.eq(element_type_id))
        .filter(element::Column::InStage.eq(true))
        .filter(element::Column::Disabled.eq(false))
        .all(conn)
        .await?;
    let ids: Vec<i32> = in_stage.iter().map(|e| e.id).collect();
    let latest = latest_activities(conn, &ids).await?;

    let doomed: Vec<i32> = ids
        .into_iter()
        .filter(|id| latest.get(id).map_or(true, |a| a.completed))
        .collect();
    tombstone(conn, &doomed).await?;
    Ok(doomed)
}

/// Pins the revisions created by an update onto in-stage elements that
/// finished at least one stage and have no pin yet.
#[instrument(skip(conn))]
pub async fn repin<C: ConnectionTrait>(
    conn: &C,
    element_type_id: i32,
    drawing_revision_id: Option<i32>,
    bom_revision_id: Option<i32>,
) -> Result<Vec<i32>, ServiceError> {
    if drawing_revision_id.is_none() && bom_revision_id.is_none() {
        return Ok(Vec::new());
    }

    let candidates = element::Entity::find()
        .filter(element::Column::ElementTypeId.eq(element_type_id))
        .filter(element::Column::InStage.eq(true))
        .all(conn)
        .await?;
    let ids: Vec<i32> = candidates.iter().map(|e| e.id).collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let finished_something: Vec<i32> = activity::Entity::find()
        .select_only()
        .column(activity::Column::ElementId)
        .filter(activity::Column::ElementId.is_in(ids))
        .filter(activity::Column::Completed.eq(true))
        .distinct()
        .into_tuple::<i32>()
        .all(conn)
        .await?;

    let now = Utc::now();
    let mut touched = Vec::new();
    for el in candidates {
        if !finished_something.contains(&el.id) {
            continue;
        }
        let mut changed = false;
        let mut active: element::ActiveModel = el.clone().into();
        if el.drawing_revision_id.is_none() {
            if let Some(rev) = drawing_revision_id {
                active.drawing_revision_id = Set(Some(rev));
                changed = true;
            }
        }
        if el.bom_revision_id.is_none() {
            if let Some(rev) = bom_revision_id {
                active.bom_revision_id = Set(Some(rev));
                changed = true;
            }
        }
        if changed {
            active.updated_at = Set(now);
            active.update(conn).await?;
            touched.push(el.id);
        }
    }
    Ok(touched)
}

/// One element as listed under its type.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ElementView {
    pub id: i32,
    pub element_type_id: i32,
    pub project_id: i32,
    pub element_name: String,
    pub target_location: i32,
    pub in_stage: bool,
    pub disabled: bool,
    pub element_type_version: String,
    pub drawing_revision_id: Option<i32>,
    pub bom_revision_id: Option<i32>,
    /// Stage of the open activity, if production is running.
    pub current_stage_id: Option<i32>,
}

impl ElementView {
    fn new(el: element::Model, open: Option<&activity::Model>) -> Self {
        Self {
            id: el.id,
            element_type_id: el.element_type_id,
            project_id: el.project_id,
            element_name: el.element_name,
            target_location: el.target_location,
            in_stage: el.in_stage,
            disabled: el.disabled,
            element_type_version: el.element_type_version,
            drawing_revision_id: el.drawing_revision_id,
            bom_revision_id: el.bom_revision_id,
            current_stage_id: open.filter(|a| !a.completed).map(|a| a.stage_id),
        }
    }
}

/// Read side of the ledger.
#[derive(Clone)]
pub struct ElementLedger {
    db: Arc<DbPool>,
    deadlines: Deadlines,
}

impl ElementLedger {
    pub fn new(db: Arc<DbPool>, deadlines: Deadlines) -> Self {
        Self { db, deadlines }
    }

    /// Elements of a type, oldest first.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn list_for_type(
        &self,
        session: &Session,
        element_type_id: i32,
        include_disabled: bool,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ElementView>, u64), ServiceError> {
        let db = self.db.as_ref();
        let scope = session.read_scope();
        self.deadlines
            .run("list_elements", async move {
                let et = require(
                    element_type::Entity::find_by_id(element_type_id).one(db).await?,
                    "element type",
                    element_type_id,
                )?;
                check_project_access(db, &scope, et.project_id).await?;

                let mut query = element::Entity::find()
                    .filter(element::Column::ElementTypeId.eq(element_type_id))
                    .order_by_asc(element::Column::Id);
                if !include_disabled {
                    query = query.filter(element::Column::Disabled.eq(false));
                }
                let paginator = query.paginate(db, page_size);
                let total = paginator.num_items().await?;
                let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

                let ids: Vec<i32> = rows.iter().map(|e| e.id).collect();
                let latest = latest_activities(db, &ids).await?;
                let views = rows
                    .into_iter()
                    .map(|el| {
                        let open = latest.get(&el.id);
                        ElementView::new(el, open)
                    })
                    .collect();
                info!(element_type_id, total, "listed elements");
                Ok((views, total))
            })
            .await
    }
}
