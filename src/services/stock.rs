//! Post-production stock: stockyard receipt, erection requests, dispatch,
//! site receipt and erection.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::elements::latest_activities;
use super::hierarchy::{resolve_locations, Location};
use crate::auth::{check_project_access, ScopePredicate, Session};
use crate::db::{for_update, require, Deadlines, DbPool};
use crate::entities::{element, element_type, precast_stock};
use crate::errors::ServiceError;
use crate::events::{ActivityEvent, EventSender};
use crate::models::stock::StockTransitionError;
use crate::models::{StockAction, StockFlags, StockStatus};

/// Stock row of one element with its derived status.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct StockView {
    pub element_id: i32,
    pub element_type_id: i32,
    pub flags: StockFlags,
    pub status: Option<StockStatus>,
    pub dispatch_start: Option<chrono::DateTime<Utc>>,
    pub dispatch_end: Option<chrono::DateTime<Utc>>,
}

impl From<&precast_stock::Model> for StockView {
    fn from(row: &precast_stock::Model) -> Self {
        let flags = StockFlags::from(row);
        Self {
            element_id: row.element_id,
            element_type_id: row.element_type_id,
            flags,
            status: flags.status(),
            dispatch_start: row.dispatch_start,
            dispatch_end: row.dispatch_end,
        }
    }
}

/// Result of a batch transition.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct StockTransition {
    pub action: StockAction,
    pub elements: Vec<StockView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Stock status counts of one location.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LocationCounts {
    pub hierarchy_id: i32,
    #[serde(flatten)]
    pub location: Location,
    /// Enabled elements at the location.
    pub elements: u64,
    /// Elements not received in the stockyard yet.
    pub not_in_stock: u64,
    pub counts: BTreeMap<StockStatus, u64>,
}

#[derive(Clone)]
pub struct StockService {
    db: Arc<DbPool>,
    deadlines: Deadlines,
    events: EventSender,
}

impl StockService {
    pub fn new(db: Arc<DbPool>, deadlines: Deadlines, events: EventSender) -> Self {
        Self {
            db,
            deadlines,
            events,
        }
    }

    /// Applies `action` to every element, all or nothing.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn transition(
        &self,
        session: &Session,
        action: StockAction,
        element_ids: Vec<i32>,
    ) -> Result<StockTransition, ServiceError> {
        if element_ids.is_empty() {
            return Err(ServiceError::InvalidInput("element_ids must not be empty".into()));
        }
        let mut ids = element_ids;
        ids.sort_unstable();
        ids.dedup();

        let db = self.db.as_ref();
        let scope = session.read_scope();
        let op = operation_name(action);

        let (rows, project_id) = self
            .deadlines
            .write(op, async move {
                let txn = db.begin().await?;
                let mut rows = Vec::with_capacity(ids.len());
                let mut project_id = None;
                for id in &ids {
                    let row = match action {
                        StockAction::ReceiveInStockyard => receive(&txn, &scope, *id).await?,
                        _ => advance(&txn, &scope, *id, action).await?,
                    };
                    project_id.get_or_insert(row.project_id);
                    rows.push(row);
                }
                txn.commit().await?;
                Ok((rows, project_id))
            })
            .await?;

        info!(%action, count = rows.len(), "stock transition applied");
        let mut warnings = Vec::new();
        let event = ActivityEvent::new(
            session,
            "precast_stock",
            op,
            format!("{} for {} element(s)", action, rows.len()),
            project_id,
        );
        warnings.extend(self.events.send_or_warn(event));

        Ok(StockTransition {
            action,
            elements: rows.iter().map(StockView::from).collect(),
            warnings,
        })
    }

    pub async fn receive_in_stockyard(
        &self,
        session: &Session,
        element_ids: Vec<i32>,
    ) -> Result<StockTransition, ServiceError> {
        self.transition(session, StockAction::ReceiveInStockyard, element_ids)
            .await
    }

    pub async fn request_erection(
        &self,
        session: &Session,
        element_ids: Vec<i32>,
    ) -> Result<StockTransition, ServiceError> {
        self.transition(session, StockAction::RequestErection, element_ids)
            .await
    }

    pub async fn dispatch(
        &self,
        session: &Session,
        element_ids: Vec<i32>,
    ) -> Result<StockTransition, ServiceError> {
        self.transition(session, StockAction::Dispatch, element_ids).await
    }

    pub async fn receive_at_site(
        &self,
        session: &Session,
        element_ids: Vec<i32>,
    ) -> Result<StockTransition, ServiceError> {
        self.transition(session, StockAction::ReceiveAtSite, element_ids)
            .await
    }

    pub async fn erect(
        &self,
        session: &Session,
        element_ids: Vec<i32>,
    ) -> Result<StockTransition, ServiceError> {
        self.transition(session, StockAction::Erect, element_ids).await
    }

    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn status(&self, session: &Session, element_id: i32) -> Result<StockView, ServiceError> {
        let db = self.db.as_ref();
        let scope = session.read_scope();
        self.deadlines
            .run_fast("stock_status", async move {
                let row = require(
                    precast_stock::Entity::find()
                        .filter(precast_stock::Column::ElementId.eq(element_id))
                        .one(db)
                        .await?,
                    "stock for element",
                    element_id,
                )?;
                check_project_access(db, &scope, row.project_id).await?;
                Ok(StockView::from(&row))
            })
            .await
    }

    /// Per-location status counts over the enabled elements of a type.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn counts(
        &self,
        session: &Session,
        element_type_id: i32,
    ) -> Result<Vec<LocationCounts>, ServiceError> {
        let db = self.db.as_ref();
        let scope = session.read_scope();
        self.deadlines
            .run("stock_counts", async move {
                let et = require(
                    element_type::Entity::find_by_id(element_type_id).one(db).await?,
                    "element type",
                    element_type_id,
                )?;
                check_project_access(db, &scope, et.project_id).await?;

                let elements = element::Entity::find()
                    .filter(element::Column::ElementTypeId.eq(element_type_id))
                    .filter(element::Column::Disabled.eq(false))
                    .all(db)
                    .await?;
                let stock: HashMap<i32, StockFlags> = precast_stock::Entity::find()
                    .filter(precast_stock::Column::ElementTypeId.eq(element_type_id))
                    .all(db)
                    .await?
                    .iter()
                    .map(|row| (row.element_id, StockFlags::from(row)))
                    .collect();

                let mut per_location: BTreeMap<i32, (u64, u64, BTreeMap<StockStatus, u64>)> =
                    BTreeMap::new();
                for el in &elements {
                    let entry = per_location.entry(el.target_location).or_default();
                    entry.0 += 1;
                    match stock.get(&el.id) {
                        None => entry.1 += 1,
                        Some(flags) => match flags.status() {
                            Some(status) => *entry.2.entry(status).or_insert(0) += 1,
                            None => warn!(element_id = el.id, ?flags, "stock flags match no status"),
                        },
                    }
                }

                let targets: Vec<i32> = per_location.keys().copied().collect();
                let locations = resolve_locations(db, &targets).await?;
                Ok(per_location
                    .into_iter()
                    .map(|(hierarchy_id, (total, missing, counts))| LocationCounts {
                        hierarchy_id,
                        location: locations.get(&hierarchy_id).cloned().unwrap_or_default(),
                        elements: total,
                        not_in_stock: missing,
                        counts,
                    })
                    .collect())
            })
            .await
    }
}

fn operation_name(action: StockAction) -> &'static str {
    match action {
        StockAction::ReceiveInStockyard => "receive_in_stockyard",
        StockAction::RequestErection => "request_erection",
        StockAction::Dispatch => "dispatch",
        StockAction::ReceiveAtSite => "receive_at_site",
        StockAction::Erect => "erect",
    }
}

/// Creates the stock row of an element whose production is over.
async fn receive<C: ConnectionTrait>(
    conn: &C,
    scope: &ScopePredicate,
    element_id: i32,
) -> Result<precast_stock::Model, ServiceError> {
    let el = require(
        element::Entity::find_by_id(element_id).one(conn).await?,
        "element",
        element_id,
    )?;
    check_project_access(conn, scope, el.project_id).await?;

    let existing = precast_stock::Entity::find()
        .filter(precast_stock::Column::ElementId.eq(element_id))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::Conflict(format!(
            "element {}: {}",
            element_id,
            StockTransitionError::AlreadyInStock
        )));
    }

    let open = latest_activities(conn, &[element_id])
        .await?
        .remove(&element_id)
        .map_or(false, |a| !a.completed);
    if !el.in_stage || open {
        return Err(ServiceError::InvalidOperation(format!(
            "element {} has not finished production",
            element_id
        )));
    }

    let flags = StockFlags::received();
    let now = Utc::now();
    Ok(precast_stock::ActiveModel {
        element_id: Set(el.id),
        element_type_id: Set(el.element_type_id),
        project_id: Set(el.project_id),
        stockyard: Set(flags.stockyard),
        dispatch_status: Set(flags.dispatch_status),
        dispatch_start: Set(None),
        dispatch_end: Set(None),
        erected: Set(flags.erected),
        order_by_erection: Set(flags.order_by_erection),
        receive_in_erection: Set(flags.receive_in_erection),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?)
}

async fn advance<C: ConnectionTrait>(
    conn: &C,
    scope: &ScopePredicate,
    element_id: i32,
    action: StockAction,
) -> Result<precast_stock::Model, ServiceError> {
    let row = require(
        for_update(
            precast_stock::Entity::find().filter(precast_stock::Column::ElementId.eq(element_id)),
            conn,
        )
        .one(conn)
        .await?,
        "stock for element",
        element_id,
    )?;
    check_project_access(conn, scope, row.project_id).await?;

    let next = StockFlags::from(&row)
        .apply(action)
        .map_err(|e| ServiceError::InvalidOperation(format!("element {}: {}", element_id, e)))?;

    let now = Utc::now();
    let mut active: precast_stock::ActiveModel = row.into();
    active.stockyard = Set(next.stockyard);
    active.dispatch_status = Set(next.dispatch_status);
    active.erected = Set(next.erected);
    active.order_by_erection = Set(next.order_by_erection);
    active.receive_in_erection = Set(next.receive_in_erection);
    match action {
        StockAction::Dispatch => active.dispatch_start = Set(Some(now)),
        StockAction::ReceiveAtSite => active.dispatch_end = Set(Some(now)),
        _ => {}
    }
    active.updated_at = Set(now);
    Ok(active.update(conn).await?)
}
