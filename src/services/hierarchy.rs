//! Project hierarchy lookups and the quantity reconciler.

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::elements::{self, Removal};
use crate::entities::{element_type, hierarchy_quantity, precast};
use crate::errors::ServiceError;
use crate::models::hierarchy::{plan_changes, QuantityTarget};

/// Tower and floor of a precast node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Location {
    pub tower_id: Option<i32>,
    pub floor_id: Option<i32>,
    pub tower_name: Option<String>,
    pub floor_name: Option<String>,
}

/// Resolves a node to its tower and floor. A node with a parent is a floor
/// and its parent the tower; a root node is a tower on its own.
pub async fn resolve_location<C: ConnectionTrait>(
    conn: &C,
    hierarchy_id: i32,
) -> Result<Location, ServiceError> {
    let node = precast::Entity::find_by_id(hierarchy_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InvariantViolation(format!("precast node {} is missing", hierarchy_id))
        })?;

    match node.parent_id {
        None => Ok(Location {
            tower_id: Some(node.id),
            floor_id: None,
            tower_name: Some(node.name),
            floor_name: None,
        }),
        Some(parent_id) => {
            let tower = precast::Entity::find_by_id(parent_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvariantViolation(format!(
                        "precast node {} points at missing parent {}",
                        node.id, parent_id
                    ))
                })?;
            Ok(Location {
                tower_id: Some(tower.id),
                floor_id: Some(node.id),
                tower_name: Some(tower.name),
                floor_name: Some(node.name),
            })
        }
    }
}

/// Resolves several nodes, each once.
pub async fn resolve_locations<C: ConnectionTrait>(
    conn: &C,
    hierarchy_ids: &[i32],
) -> Result<HashMap<i32, Location>, ServiceError> {
    let mut out = HashMap::new();
    for &id in hierarchy_ids {
        if out.contains_key(&id) {
            continue;
        }
        let loc = resolve_location(conn, id).await?;
        out.insert(id, loc);
    }
    Ok(out)
}

/// Requested quantity as it arrives from a client. The naming convention
/// defaults to the node's own convention, then its name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestedQuantity {
    pub hierarchy_id: i32,
    pub quantity: i32,
    pub naming_convention: Option<String>,
}

/// Checks that every node belongs to the project and fills in naming
/// conventions.
pub async fn targets_for<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
    requested: &[RequestedQuantity],
) -> Result<Vec<QuantityTarget>, ServiceError> {
    let mut targets = Vec::with_capacity(requested.len());
    for req in requested {
        if req.quantity < 0 {
            return Err(ServiceError::InvalidInput(format!(
                "quantity for hierarchy {} must not be negative",
                req.hierarchy_id
            )));
        }
        let node = precast::Entity::find_by_id(req.hierarchy_id)
            .one(conn)
            .await?
            .filter(|n| n.project_id == project_id)
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!(
                    "hierarchy {} does not belong to project {}",
                    req.hierarchy_id, project_id
                ))
            })?;
        let naming = req
            .naming_convention
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or(node.naming_convention)
            .unwrap_or(node.name);
        targets.push(QuantityTarget {
            hierarchy_id: req.hierarchy_id,
            quantity: req.quantity,
            naming_convention: naming,
        });
    }
    Ok(targets)
}

/// What one reconciliation did to the element population.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<i32>,
    pub removed: Removal,
    /// `Σ quantity` over every hierarchy row of the type afterwards.
    pub total: i32,
}

/// Brings the element population in line with `targets` and upserts the
/// hierarchy rows. Hierarchies not named in `targets` are untouched. The
/// caller persists `total` on the type row.
#[instrument(skip(conn, et, targets), fields(element_type_id = et.element_type_id))]
pub async fn reconcile<C: ConnectionTrait>(
    conn: &C,
    et: &element_type::Model,
    targets: &[QuantityTarget],
    actor: i32,
) -> Result<ReconcileReport, ServiceError> {
    let rows = hierarchy_quantity::Entity::find()
        .filter(hierarchy_quantity::Column::ElementTypeId.eq(et.element_type_id))
        .all(conn)
        .await?;
    let current: BTreeMap<i32, i32> = rows.iter().map(|r| (r.hierarchy_id, r.quantity)).collect();
    let mut by_hierarchy: HashMap<i32, hierarchy_quantity::Model> =
        rows.into_iter().map(|r| (r.hierarchy_id, r)).collect();

    let mut report = ReconcileReport::default();
    for change in plan_changes(&current, targets) {
        let delta = change.delta();
        if delta > 0 {
            let ids = elements::materialize(
                conn,
                et,
                change.hierarchy_id,
                &change.naming_convention,
                delta.unsigned_abs(),
                actor,
            )
            .await?;
            report.added.extend(ids);
        } else if delta < 0 {
            let removal = elements::remove_newest(
                conn,
                et.element_type_id,
                change.hierarchy_id,
                delta.unsigned_abs(),
            )
            .await?;
            report.removed.extend(removal);
        }

        match by_hierarchy.remove(&change.hierarchy_id) {
            Some(existing) => {
                if existing.quantity != change.desired
                    || existing.naming_convention != change.naming_convention
                {
                    let mut active: hierarchy_quantity::ActiveModel = existing.into();
                    active.quantity = Set(change.desired);
                    active.naming_convention = Set(change.naming_convention.clone());
                    active.update(conn).await?;
                }
            }
            None => {
                hierarchy_quantity::ActiveModel {
                    element_type_id: Set(et.element_type_id),
                    project_id: Set(et.project_id),
                    hierarchy_id: Set(change.hierarchy_id),
                    quantity: Set(change.desired),
                    naming_convention: Set(change.naming_convention.clone()),
                    ..Default::default()
                }
                .insert(conn)
                .await?;
            }
        }
        metrics::counter!("precast.reconcile.delta", u64::from(delta.unsigned_abs()));
    }

    report.total = total_quantity(conn, et.element_type_id).await?;
    info!(
        added = report.added.len(),
        deleted = report.removed.deleted.len(),
        disabled = report.removed.disabled.len(),
        total = report.total,
        "hierarchy reconciled"
    );
    Ok(report)
}

pub async fn total_quantity<C: ConnectionTrait>(
    conn: &C,
    element_type_id: i32,
) -> Result<i32, ServiceError> {
    let rows = hierarchy_quantity::Entity::find()
        .filter(hierarchy_quantity::Column::ElementTypeId.eq(element_type_id))
        .all(conn)
        .await?;
    Ok(rows.iter().map(|r| r.quantity).sum())
}
