//! Element type aggregate: the canonical definition of a precast part and
//! the propagation of its edits to hierarchy rows, BOM, drawings and
//! elements.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::elements::{self, Removal};
use super::hierarchy::{self, Location, RequestedQuantity};
use super::pipeline::{reset_in_flight, stage_path_of, validate_stage_path};
use super::revisions;
use crate::auth::{check_project_access, ScopePredicate, Session};
use crate::config::{DeletePolicy, EngineOptions};
use crate::db::{for_update, require, Deadlines, DbPool};
use crate::entities::{bom_line, drawing, element, element_type, hierarchy_quantity};
use crate::errors::ServiceError;
use crate::events::{ActivityEvent, EventSender};
use crate::models::lenient;
use crate::models::version::{next_version_code, INITIAL_VERSION};
use crate::models::{Geometry, StagePath};

const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct HierarchyInput {
    #[serde(deserialize_with = "lenient::i32_from_any")]
    #[schema(value_type = i32)]
    pub hierarchy_id: i32,
    #[validate(range(min = 0))]
    #[serde(deserialize_with = "lenient::i32_from_any")]
    #[schema(value_type = i32)]
    pub quantity: i32,
    #[serde(default)]
    pub naming_convention: Option<String>,
}

impl From<&HierarchyInput> for RequestedQuantity {
    fn from(h: &HierarchyInput) -> Self {
        RequestedQuantity {
            hierarchy_id: h.hierarchy_id,
            quantity: h.quantity,
            naming_convention: h.naming_convention.clone(),
        }
    }
}

/// A drawing file for one drawing type.
#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct DrawingInput {
    #[serde(deserialize_with = "lenient::i32_from_any")]
    #[schema(value_type = i32)]
    pub drawing_type_id: i32,
    #[validate(length(min = 1, max = 1024))]
    pub file: String,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct BomInput {
    #[serde(deserialize_with = "lenient::i32_from_any")]
    #[schema(value_type = i32)]
    pub product_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub product_name: String,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 32))]
    pub unit: String,
    #[serde(default)]
    pub rate: Decimal,
}

#[derive(Clone, Debug, Deserialize, Validate, ToSchema)]
pub struct CreateElementTypeInput {
    #[serde(deserialize_with = "lenient::i32_from_any")]
    #[schema(value_type = i32)]
    pub project_id: i32,
    #[validate(length(min = 1, max = 64))]
    pub element_type: String,
    #[validate(length(min = 1, max = 255))]
    pub element_type_name: String,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(deserialize_with = "lenient::vec_i32_from_any")]
    #[schema(value_type = Vec<i32>)]
    pub stage_path: Vec<i32>,
    #[validate]
    pub hierarchy: Vec<HierarchyInput>,
    #[serde(default)]
    #[validate]
    pub drawings: Vec<DrawingInput>,
    #[serde(default)]
    #[validate]
    pub bom: Vec<BomInput>,
}

/// Patch of an element type. Zero geometry fields and absent collections
/// leave the stored values alone.
#[derive(Clone, Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateElementTypeInput {
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub element_type: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub element_type_name: Option<String>,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default)]
    pub stage_path: Option<Vec<i32>>,
    #[serde(default)]
    pub hierarchy: Option<Vec<HierarchyInput>>,
    #[serde(default)]
    #[validate]
    pub drawings: Vec<DrawingInput>,
    #[serde(default)]
    pub bom: Option<Vec<BomInput>>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct HierarchyView {
    pub hierarchy_id: i32,
    pub quantity: i32,
    pub naming_convention: String,
    #[serde(flatten)]
    pub location: Location,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct DrawingRevisionView {
    pub drawing_revision_id: i32,
    pub version: i32,
    pub file: String,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct DrawingView {
    pub drawing_id: i32,
    pub drawing_type_id: i32,
    pub current_version: i32,
    pub file: String,
    pub comments: Option<String>,
    pub revisions: Vec<DrawingRevisionView>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BomLineView {
    pub id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub rate: Decimal,
}

impl From<bom_line::Model> for BomLineView {
    fn from(b: bom_line::Model) -> Self {
        Self {
            id: b.id,
            product_id: b.product_id,
            product_name: b.product_name,
            quantity: b.quantity,
            unit: b.unit,
            rate: b.rate,
        }
    }
}

/// An element type with everything it owns.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ElementTypeDetail {
    pub element_type_id: i32,
    pub project_id: i32,
    pub element_type: String,
    pub element_type_name: String,
    #[serde(flatten)]
    pub geometry: Geometry,
    pub density: Decimal,
    pub element_type_version: String,
    pub total_count_element: i32,
    pub stage_path: Vec<i32>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub hierarchy: Vec<HierarchyView>,
    pub drawings: Vec<DrawingView>,
    pub bom: Vec<BomLineView>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ElementTypeSummary {
    pub element_type_id: i32,
    pub project_id: i32,
    pub element_type: String,
    pub element_type_name: String,
    pub element_type_version: String,
    pub total_count_element: i32,
    pub volume: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<element_type::Model> for ElementTypeSummary {
    fn from(m: element_type::Model) -> Self {
        Self {
            element_type_id: m.element_type_id,
            project_id: m.project_id,
            element_type: m.element_type,
            element_type_name: m.element_type_name,
            element_type_version: m.element_type_version,
            total_count_element: m.total_count_element,
            volume: m.volume,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CreatedElementType {
    pub element_type: ElementTypeDetail,
    pub element_ids: Vec<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Everything one update did.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct UpdateOutcome {
    pub element_type: ElementTypeDetail,
    pub previous_version: String,
    pub added_elements: Vec<i32>,
    pub deleted_elements: Vec<i32>,
    pub disabled_elements: Vec<i32>,
    pub repinned_elements: Vec<i32>,
    pub reset_elements: Vec<i32>,
    pub bom_snapshot_ids: Vec<i32>,
    pub drawing_revision_ids: Vec<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct DeleteOutcome {
    pub element_type_id: i32,
    #[schema(value_type = String)]
    pub policy: DeletePolicy,
    pub hierarchy_rows_removed: u64,
    pub bom_lines_removed: u64,
    pub drawings_removed: u64,
    pub elements_disabled: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn random_type_id() -> i32 {
    rand::thread_rng().gen_range(100_000..i32::MAX)
}

fn to_stage_path(stages: Vec<i32>) -> Result<StagePath, ServiceError> {
    StagePath::new(stages).map_err(|e| ServiceError::InvalidInput(format!("stage_path: {}", e)))
}

fn check_geometry(g: &Geometry) -> Result<(), ServiceError> {
    if g.has_negative() {
        Err(ServiceError::InvalidInput(
            "geometry values must not be negative".into(),
        ))
    } else {
        Ok(())
    }
}

async fn insert_bom<C: ConnectionTrait>(
    conn: &C,
    et: &element_type::Model,
    lines: &[BomInput],
) -> Result<(), ServiceError> {
    let now = Utc::now();
    for line in lines {
        bom_line::ActiveModel {
            element_type_id: Set(et.element_type_id),
            project_id: Set(et.project_id),
            product_id: Set(line.product_id),
            product_name: Set(line.product_name.trim().to_string()),
            quantity: Set(line.quantity),
            unit: Set(line.unit.trim().to_string()),
            rate: Set(line.rate),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

/// Appends a revision to the drawing of the same type, creating the drawing
/// at version 1 when the type has none yet. Returns the revision id.
async fn upsert_drawing<C: ConnectionTrait>(
    conn: &C,
    et: &element_type::Model,
    input: &DrawingInput,
    actor: i32,
) -> Result<i32, ServiceError> {
    let now = Utc::now();
    let existing = drawing::Entity::find()
        .filter(drawing::Column::ElementTypeId.eq(et.element_type_id))
        .filter(drawing::Column::DrawingTypeId.eq(input.drawing_type_id))
        .order_by_asc(drawing::Column::DrawingId)
        .one(conn)
        .await?;

    match existing {
        Some(parent) => {
            let version = parent.current_version + 1;
            let rev_id = revisions::append_drawing_revision(
                conn,
                &parent,
                version,
                &input.file,
                input.comments.clone(),
                actor,
            )
            .await?;
            let mut active: drawing::ActiveModel = parent.into();
            active.current_version = Set(version);
            active.file = Set(input.file.clone());
            active.comments = Set(input.comments.clone());
            active.updated_at = Set(now);
            active.update(conn).await?;
            Ok(rev_id)
        }
        None => {
            let parent = drawing::ActiveModel {
                element_type_id: Set(et.element_type_id),
                project_id: Set(et.project_id),
                drawing_type_id: Set(input.drawing_type_id),
                current_version: Set(1),
                file: Set(input.file.clone()),
                comments: Set(input.comments.clone()),
                created_by: Set(actor),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(conn)
            .await?;
            revisions::append_drawing_revision(
                conn,
                &parent,
                1,
                &input.file,
                input.comments.clone(),
                actor,
            )
            .await
        }
    }
}

/// Reads a type with its hierarchy, drawings and BOM.
pub async fn load_detail<C: ConnectionTrait>(
    conn: &C,
    et: element_type::Model,
) -> Result<ElementTypeDetail, ServiceError> {
    let path = stage_path_of(&et)?;

    let quantities = hierarchy_quantity::Entity::find()
        .filter(hierarchy_quantity::Column::ElementTypeId.eq(et.element_type_id))
        .order_by_asc(hierarchy_quantity::Column::HierarchyId)
        .all(conn)
        .await?;
    let hierarchy_ids: Vec<i32> = quantities.iter().map(|q| q.hierarchy_id).collect();
    let locations = hierarchy::resolve_locations(conn, &hierarchy_ids).await?;
    let hierarchy = quantities
        .into_iter()
        .map(|q| HierarchyView {
            location: locations.get(&q.hierarchy_id).cloned().unwrap_or_default(),
            hierarchy_id: q.hierarchy_id,
            quantity: q.quantity,
            naming_convention: q.naming_convention,
        })
        .collect();

    let mut drawings = Vec::new();
    for d in drawing::Entity::find()
        .filter(drawing::Column::ElementTypeId.eq(et.element_type_id))
        .order_by_asc(drawing::Column::DrawingId)
        .all(conn)
        .await?
    {
        let revisions = revisions::drawing_history(conn, d.drawing_id)
            .await?
            .into_iter()
            .map(|r| DrawingRevisionView {
                drawing_revision_id: r.drawing_revision_id,
                version: r.version,
                file: r.file,
                comments: r.comments,
                created_at: r.created_at,
            })
            .collect();
        drawings.push(DrawingView {
            drawing_id: d.drawing_id,
            drawing_type_id: d.drawing_type_id,
            current_version: d.current_version,
            file: d.file,
            comments: d.comments,
            revisions,
        });
    }

    let bom = bom_line::Entity::find()
        .filter(bom_line::Column::ElementTypeId.eq(et.element_type_id))
        .order_by_asc(bom_line::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(BomLineView::from)
        .collect();

    Ok(ElementTypeDetail {
        element_type_id: et.element_type_id,
        project_id: et.project_id,
        element_type: et.element_type,
        element_type_name: et.element_type_name,
        geometry: Geometry {
            thickness: et.thickness,
            length: et.length,
            height: et.height,
            width: et.width,
            area: et.area,
            volume: et.volume,
            mass: et.mass,
        },
        density: et.density,
        element_type_version: et.element_type_version,
        total_count_element: et.total_count_element,
        stage_path: path.stages().to_vec(),
        created_by: et.created_by,
        created_at: et.created_at,
        updated_at: et.updated_at,
        hierarchy,
        drawings,
        bom,
    })
}

#[derive(Clone)]
pub struct ElementTypeService {
    db: Arc<DbPool>,
    deadlines: Deadlines,
    events: EventSender,
    options: EngineOptions,
}

impl ElementTypeService {
    pub fn new(
        db: Arc<DbPool>,
        deadlines: Deadlines,
        events: EventSender,
        options: EngineOptions,
    ) -> Self {
        Self {
            db,
            deadlines,
            events,
            options,
        }
    }

    /// Creates a type with its hierarchy, drawings and BOM and materialises
    /// its elements, all in one transaction.
    #[instrument(skip(self, session, input), fields(user_id = session.user_id, project_id = input.project_id))]
    pub async fn create(
        &self,
        session: &Session,
        input: CreateElementTypeInput,
    ) -> Result<CreatedElementType, ServiceError> {
        input.validate()?;
        check_geometry(&input.geometry)?;
        let path = to_stage_path(input.stage_path.clone())?;

        let db = self.db.as_ref();
        let scope = session.read_scope();
        let actor = session.user_id;

        let (detail, element_ids) = self
            .deadlines
            .write("create_element_type", async move {
                let txn = db.begin().await?;
                check_project_access(&txn, &scope, input.project_id).await?;
                validate_stage_path(&txn, input.project_id, &path).await?;

                let code = input.element_type.trim().to_string();
                let taken = element_type::Entity::find()
                    .filter(element_type::Column::ProjectId.eq(input.project_id))
                    .filter(element_type::Column::ElementType.eq(code.clone()))
                    .count(&txn)
                    .await?;
                if taken > 0 {
                    return Err(ServiceError::Conflict(format!(
                        "element type {} already exists in project {}",
                        code, input.project_id
                    )));
                }

                let requested: Vec<RequestedQuantity> =
                    input.hierarchy.iter().map(RequestedQuantity::from).collect();
                let targets = hierarchy::targets_for(&txn, input.project_id, &requested).await?;

                let mut id = None;
                for _ in 0..MAX_ID_ATTEMPTS {
                    let candidate = random_type_id();
                    if element_type::Entity::find_by_id(candidate)
                        .one(&txn)
                        .await?
                        .is_none()
                    {
                        id = Some(candidate);
                        break;
                    }
                }
                let id = id.ok_or_else(|| {
                    ServiceError::InternalError("could not allocate an element type id".into())
                })?;

                let g = input.geometry;
                let now = Utc::now();
                let et = element_type::ActiveModel {
                    element_type_id: Set(id),
                    project_id: Set(input.project_id),
                    element_type: Set(code),
                    element_type_name: Set(input.element_type_name.trim().to_string()),
                    thickness: Set(g.thickness),
                    length: Set(g.length),
                    height: Set(g.height),
                    width: Set(g.width),
                    area: Set(g.area),
                    volume: Set(g.volume),
                    mass: Set(g.mass),
                    density: Set(g.density()),
                    element_type_version: Set(INITIAL_VERSION.to_string()),
                    total_count_element: Set(0),
                    stage_path: Set(path.to_storage()),
                    created_by: Set(actor),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;

                for d in &input.drawings {
                    upsert_drawing(&txn, &et, d, actor).await?;
                }
                insert_bom(&txn, &et, &input.bom).await?;

                let report = hierarchy::reconcile(&txn, &et, &targets, actor).await?;
                let mut active: element_type::ActiveModel = et.into();
                active.total_count_element = Set(report.total);
                let et = active.update(&txn).await?;

                let detail = load_detail(&txn, et).await?;
                txn.commit().await?;
                Ok((detail, report.added))
            })
            .await?;

        info!(
            element_type_id = detail.element_type_id,
            elements = element_ids.len(),
            "element type created"
        );
        metrics::counter!("precast.element_type.created", 1);

        let warnings = self
            .events
            .send_or_warn(ActivityEvent::new(
                session,
                "element_type",
                "create",
                format!(
                    "created element type {} with {} element(s)",
                    detail.element_type,
                    element_ids.len()
                ),
                Some(detail.project_id),
            ))
            .into_iter()
            .collect();

        Ok(CreatedElementType {
            element_type: detail,
            element_ids,
            warnings,
        })
    }

    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn get(&self, session: &Session, element_type_id: i32) -> Result<ElementTypeDetail, ServiceError> {
        let db = self.db.as_ref();
        let scope = session.read_scope();
        self.deadlines
            .run("get_element_type", async move {
                let et = require(
                    element_type::Entity::find_by_id(element_type_id).one(db).await?,
                    "element type",
                    element_type_id,
                )?;
                check_project_access(db, &scope, et.project_id).await?;
                load_detail(db, et).await
            })
            .await
    }

    /// Role-scoped page of types, optionally narrowed to one project.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn list(
        &self,
        session: &Session,
        project_id: Option<i32>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ElementTypeSummary>, u64), ServiceError> {
        let db = self.db.as_ref();
        let scope = session.read_scope();
        self.deadlines
            .run("list_element_types", async move {
                let mut query = element_type::Entity::find()
                    .order_by_asc(element_type::Column::ElementType)
                    .order_by_asc(element_type::Column::ElementTypeId);
                if !matches!(scope, ScopePredicate::All) {
                    query = query.filter(scope.condition(element_type::Column::ProjectId));
                }
                if let Some(pid) = project_id {
                    query = query.filter(element_type::Column::ProjectId.eq(pid));
                }
                let paginator = query.paginate(db, page_size);
                let total = paginator.num_items().await?;
                let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
                Ok((rows.into_iter().map(ElementTypeSummary::from).collect(), total))
            })
            .await
    }

    /// Applies a patch and propagates it, as one critical section on the
    /// type row.
    #[instrument(skip(self, session, patch), fields(user_id = session.user_id))]
    pub async fn update(
        &self,
        session: &Session,
        element_type_id: i32,
        patch: UpdateElementTypeInput,
    ) -> Result<UpdateOutcome, ServiceError> {
        patch.validate()?;
        for h in patch.hierarchy.iter().flatten() {
            h.validate()?;
        }
        for b in patch.bom.iter().flatten() {
            b.validate()?;
        }
        check_geometry(&patch.geometry)?;
        let new_path = patch.stage_path.clone().map(to_stage_path).transpose()?;

        let db = self.db.as_ref();
        let scope = session.read_scope();
        let actor = session.user_id;
        let dedupe = self.options.dedupe_bom_snapshots;

        let outcome = self
            .deadlines
            .write("update_element_type", async move {
                let txn = db.begin().await?;

                // 1. lock and load
                let current = require(
                    for_update(element_type::Entity::find_by_id(element_type_id), &txn)
                        .one(&txn)
                        .await?,
                    "element type",
                    element_type_id,
                )?;
                check_project_access(&txn, &scope, current.project_id).await?;
                let previous_version = current.element_type_version.clone();

                let path = match new_path {
                    Some(p) => {
                        validate_stage_path(&txn, current.project_id, &p).await?;
                        p
                    }
                    None => stage_path_of(&current)?,
                };

                // 2. and 3. fresh version, non-zero scalars
                let mut geometry = Geometry {
                    thickness: current.thickness,
                    length: current.length,
                    height: current.height,
                    width: current.width,
                    area: current.area,
                    volume: current.volume,
                    mass: current.mass,
                };
                geometry.merge_non_zero(&patch.geometry);

                let mut active: element_type::ActiveModel = current.clone().into();
                active.element_type_version = Set(next_version_code(&previous_version));
                if let Some(code) = patch.element_type.as_deref().map(str::trim) {
                    if code != current.element_type {
                        let taken = element_type::Entity::find()
                            .filter(element_type::Column::ProjectId.eq(current.project_id))
                            .filter(element_type::Column::ElementType.eq(code))
                            .count(&txn)
                            .await?;
                        if taken > 0 {
                            return Err(ServiceError::Conflict(format!(
                                "element type {} already exists in project {}",
                                code, current.project_id
                            )));
                        }
                        active.element_type = Set(code.to_string());
                    }
                }
                if let Some(name) = patch.element_type_name.as_deref().map(str::trim) {
                    active.element_type_name = Set(name.to_string());
                }
                active.thickness = Set(geometry.thickness);
                active.length = Set(geometry.length);
                active.height = Set(geometry.height);
                active.width = Set(geometry.width);
                active.area = Set(geometry.area);
                active.volume = Set(geometry.volume);
                active.mass = Set(geometry.mass);
                active.density = Set(geometry.density());
                active.stage_path = Set(path.to_storage());
                active.updated_at = Set(Utc::now());
                let et = active.update(&txn).await?;

                // 4. hierarchy
                let mut added = Vec::new();
                let mut removed = Removal::default();
                if let Some(hierarchy) = &patch.hierarchy {
                    let requested: Vec<RequestedQuantity> =
                        hierarchy.iter().map(RequestedQuantity::from).collect();
                    let targets = hierarchy::targets_for(&txn, et.project_id, &requested).await?;
                    let report = hierarchy::reconcile(&txn, &et, &targets, actor).await?;
                    added = report.added;
                    removed = report.removed;
                }
                let total = hierarchy::total_quantity(&txn, et.element_type_id).await?;

                // 5. and 6. snapshot, then replace
                let bom_snapshot_ids =
                    revisions::snapshot_bom(&txn, et.element_type_id, actor, dedupe).await?;
                if let Some(lines) = &patch.bom {
                    bom_line::Entity::delete_many()
                        .filter(bom_line::Column::ElementTypeId.eq(et.element_type_id))
                        .exec(&txn)
                        .await?;
                    insert_bom(&txn, &et, lines).await?;
                }

                // 7. drawings
                let mut drawing_revision_ids = Vec::with_capacity(patch.drawings.len());
                for d in &patch.drawings {
                    drawing_revision_ids.push(upsert_drawing(&txn, &et, d, actor).await?);
                }

                // 8. to 10. repin, disable, reset
                let repinned_elements = elements::repin(
                    &txn,
                    et.element_type_id,
                    drawing_revision_ids.first().copied(),
                    bom_snapshot_ids.first().copied(),
                )
                .await?;
                let mut disabled_elements = removed.disabled;
                disabled_elements.extend(elements::disable_finished(&txn, et.element_type_id).await?);
                let reset_elements = reset_in_flight(&txn, et.element_type_id, &path).await?;

                let mut active: element_type::ActiveModel = et.into();
                active.total_count_element = Set(total);
                let et = active.update(&txn).await?;

                let detail = load_detail(&txn, et).await?;
                txn.commit().await?;

                Ok(UpdateOutcome {
                    element_type: detail,
                    previous_version,
                    added_elements: added,
                    deleted_elements: removed.deleted,
                    disabled_elements,
                    repinned_elements,
                    reset_elements,
                    bom_snapshot_ids,
                    drawing_revision_ids,
                    warnings: Vec::new(),
                })
            })
            .await;

        let mut outcome = match outcome {
            Ok(o) => o,
            Err(e) => {
                if e.is_internal() {
                    error!(element_type_id, error = %e, "element type update rolled back");
                }
                metrics::counter!("precast.element_type.update_failed", 1);
                return Err(e);
            }
        };

        info!(
            element_type_id,
            version = %outcome.element_type.element_type_version,
            added = outcome.added_elements.len(),
            deleted = outcome.deleted_elements.len(),
            disabled = outcome.disabled_elements.len(),
            reset = outcome.reset_elements.len(),
            "element type updated"
        );
        metrics::counter!("precast.element_type.updated", 1);

        let event = ActivityEvent::new(
            session,
            "element_type",
            "update",
            format!(
                "updated element type {} to {}",
                outcome.element_type.element_type, outcome.element_type.element_type_version
            ),
            Some(outcome.element_type.project_id),
        );
        outcome.warnings.extend(self.events.send_or_warn(event));
        Ok(outcome)
    }

    /// Deletes a type under the configured policy.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn delete(&self, session: &Session, element_type_id: i32) -> Result<DeleteOutcome, ServiceError> {
        let db = self.db.as_ref();
        let scope = session.read_scope();
        let actor = session.user_id;
        let policy = self.options.delete_policy;

        let (mut outcome, code, project_id) = self
            .deadlines
            .write("delete_element_type", async move {
                let txn = db.begin().await?;
                let et = require(
                    for_update(element_type::Entity::find_by_id(element_type_id), &txn)
                        .one(&txn)
                        .await?,
                    "element type",
                    element_type_id,
                )?;
                check_project_access(&txn, &scope, et.project_id).await?;

                let mut outcome = DeleteOutcome {
                    element_type_id,
                    policy,
                    hierarchy_rows_removed: 0,
                    bom_lines_removed: 0,
                    drawings_removed: 0,
                    elements_disabled: 0,
                    warnings: Vec::new(),
                };

                if policy == DeletePolicy::Cascade {
                    outcome.hierarchy_rows_removed = hierarchy_quantity::Entity::delete_many()
                        .filter(hierarchy_quantity::Column::ElementTypeId.eq(element_type_id))
                        .exec(&txn)
                        .await?
                        .rows_affected;

                    revisions::snapshot_bom(&txn, element_type_id, actor, false).await?;
                    outcome.bom_lines_removed = bom_line::Entity::delete_many()
                        .filter(bom_line::Column::ElementTypeId.eq(element_type_id))
                        .exec(&txn)
                        .await?
                        .rows_affected;

                    outcome.drawings_removed = drawing::Entity::delete_many()
                        .filter(drawing::Column::ElementTypeId.eq(element_type_id))
                        .exec(&txn)
                        .await?
                        .rows_affected;

                    outcome.elements_disabled = element::Entity::update_many()
                        .col_expr(element::Column::Disabled, Expr::value(true))
                        .col_expr(element::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(element::Column::ElementTypeId.eq(element_type_id))
                        .filter(element::Column::Disabled.eq(false))
                        .exec(&txn)
                        .await?
                        .rows_affected;
                }

                element_type::Entity::delete_by_id(element_type_id)
                    .exec(&txn)
                    .await?;
                txn.commit().await?;
                Ok((outcome, et.element_type, et.project_id))
            })
            .await?;

        info!(element_type_id, %policy, "element type deleted");
        let event = ActivityEvent::new(
            session,
            "element_type",
            "delete",
            format!("deleted element type {}", code),
            Some(project_id),
        );
        outcome.warnings.extend(self.events.send_or_warn(event));
        Ok(outcome)
    }
}
