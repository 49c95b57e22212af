//! Append-only drawing and BOM history.
//!
//! Nothing in here issues `UPDATE` or `DELETE` against `drawings_revision` or
//! `element_type_revision_bom`.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::entities::{bom_line, bom_revision, drawing, drawing_revision};
use crate::errors::ServiceError;

/// Copies every current BOM line of the type into the revision table and
/// returns the new revision ids in line id order.
///
/// With `dedupe` set, lines whose newest snapshot already carries the same
/// product, quantity, unit and rate are skipped.
#[instrument(skip(conn))]
pub async fn snapshot_bom<C: ConnectionTrait>(
    conn: &C,
    element_type_id: i32,
    actor: i32,
    dedupe: bool,
) -> Result<Vec<i32>, ServiceError> {
    let lines = bom_line::Entity::find()
        .filter(bom_line::Column::ElementTypeId.eq(element_type_id))
        .order_by_asc(bom_line::Column::Id)
        .all(conn)
        .await?;

    let latest: HashMap<i32, bom_revision::Model> = if dedupe {
        latest_snapshots(conn, element_type_id).await?
    } else {
        HashMap::new()
    };

    let now = Utc::now();
    let mut ids = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(prev) = latest.get(&line.id) {
            if same_values(prev, &line) {
                continue;
            }
        }
        let rev = bom_revision::ActiveModel {
            source_bom_id: Set(line.id),
            element_type_id: Set(line.element_type_id),
            product_id: Set(line.product_id),
            product_name: Set(line.product_name.clone()),
            quantity: Set(line.quantity),
            unit: Set(line.unit.clone()),
            rate: Set(line.rate),
            changed_at: Set(now),
            changed_by: Set(actor),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        ids.push(rev.id);
    }

    debug!(element_type_id, snapshots = ids.len(), "BOM snapshot taken");
    metrics::counter!("precast.bom.snapshot_rows", ids.len() as u64);
    Ok(ids)
}

async fn latest_snapshots<C: ConnectionTrait>(
    conn: &C,
    element_type_id: i32,
) -> Result<HashMap<i32, bom_revision::Model>, ServiceError> {
    let rows = bom_revision::Entity::find()
        .filter(bom_revision::Column::ElementTypeId.eq(element_type_id))
        .order_by_asc(bom_revision::Column::Id)
        .all(conn)
        .await?;
    // ascending order, so later rows overwrite older ones
    Ok(rows.into_iter().map(|r| (r.source_bom_id, r)).collect())
}

fn same_values(rev: &bom_revision::Model, line: &bom_line::Model) -> bool {
    rev.product_id == line.product_id
        && rev.product_name == line.product_name
        && rev.quantity == line.quantity
        && rev.unit == line.unit
        && rev.rate == line.rate
}

/// Appends one revision row for `parent`. The version must be above every
/// existing version of that drawing; the unique index on
/// `(parent_drawing_id, version)` backs this up.
#[instrument(skip(conn, parent, file, comments), fields(drawing_id = parent.drawing_id))]
pub async fn append_drawing_revision<C: ConnectionTrait>(
    conn: &C,
    parent: &drawing::Model,
    version: i32,
    file: &str,
    comments: Option<String>,
    actor: i32,
) -> Result<i32, ServiceError> {
    let newest = drawing_revision::Entity::find()
        .filter(drawing_revision::Column::ParentDrawingId.eq(parent.drawing_id))
        .order_by_desc(drawing_revision::Column::Version)
        .one(conn)
        .await?;
    if let Some(prev) = newest {
        if version <= prev.version {
            return Err(ServiceError::InvariantViolation(format!(
                "drawing {} revision {} is not above {}",
                parent.drawing_id, version, prev.version
            )));
        }
    }

    let rev = drawing_revision::ActiveModel {
        parent_drawing_id: Set(parent.drawing_id),
        element_type_id: Set(parent.element_type_id),
        drawing_type_id: Set(parent.drawing_type_id),
        version: Set(version),
        file: Set(file.to_string()),
        comments: Set(comments),
        created_by: Set(actor),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(rev.drawing_revision_id)
}

/// Revisions of one drawing, oldest first.
pub async fn drawing_history<C: ConnectionTrait>(
    conn: &C,
    drawing_id: i32,
) -> Result<Vec<drawing_revision::Model>, ServiceError> {
    Ok(drawing_revision::Entity::find()
        .filter(drawing_revision::Column::ParentDrawingId.eq(drawing_id))
        .order_by_asc(drawing_revision::Column::Version)
        .all(conn)
        .await?)
}
