//! Stage pipeline: entry, advance and reset of element activities.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::elements::latest_activities;
use crate::auth::{check_project_access, Session};
use crate::db::{for_update, require, Deadlines, DbPool};
use crate::entities::{activity, complete_production, element, element_type, precast_stock, project_stage};
use crate::errors::ServiceError;
use crate::events::{ActivityEvent, EventSender};
use crate::models::{ActivityStatuses, StagePath, StatusPatch, StatusValue, StockFlags, StockStatus};

/// Parses the stored stage path of a type. An unreadable path is an
/// internal fault, never a client error.
pub fn stage_path_of(et: &element_type::Model) -> Result<StagePath, ServiceError> {
    StagePath::parse(&et.stage_path).map_err(|e| {
        ServiceError::InvariantViolation(format!(
            "element type {} has an invalid stage path: {}",
            et.element_type_id, e
        ))
    })
}

/// Stage rows of a project keyed by id.
pub async fn project_stages<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
) -> Result<HashMap<i32, project_stage::Model>, ServiceError> {
    let rows = project_stage::Entity::find()
        .filter(project_stage::Column::ProjectId.eq(project_id))
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|s| (s.id, s)).collect())
}

/// Rejects paths naming stages the project does not have.
pub async fn validate_stage_path<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
    path: &StagePath,
) -> Result<(), ServiceError> {
    let stages = project_stages(conn, project_id).await?;
    let unknown: Vec<String> = path
        .stages()
        .iter()
        .filter(|id| !stages.contains_key(id))
        .map(|id| id.to_string())
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "stages {} are not defined for project {}",
            unknown.join(","),
            project_id
        )))
    }
}

async fn stage_defaults<C: ConnectionTrait>(
    conn: &C,
    stage_id: i32,
) -> Result<project_stage::Model, ServiceError> {
    project_stage::Entity::find_by_id(stage_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::InvariantViolation(format!("project stage {} is missing", stage_id)))
}

fn statuses_of(a: &activity::Model) -> ActivityStatuses {
    ActivityStatuses {
        status: StatusValue::from_column(&a.status),
        qc: StatusValue::from_column(&a.qc_status),
        mesh_mold: StatusValue::from_column(&a.mesh_mold_status),
        reinforcement: StatusValue::from_column(&a.reinforcement_status),
    }
}

fn set_statuses(active: &mut activity::ActiveModel, s: &ActivityStatuses) {
    active.status = Set(s.status.as_column().to_string());
    active.qc_status = Set(s.qc.as_column().to_string());
    active.mesh_mold_status = Set(s.mesh_mold.as_column().to_string());
    active.reinforcement_status = Set(s.reinforcement.as_column().to_string());
}

/// New in-progress activity at `stage`, staffed from the stage defaults.
async fn open_activity<C: ConnectionTrait>(
    conn: &C,
    el: &element::Model,
    stage_id: i32,
) -> Result<activity::Model, ServiceError> {
    let defaults = stage_defaults(conn, stage_id).await?;
    let now = Utc::now();
    let mut active = activity::ActiveModel {
        element_id: Set(el.id),
        project_id: Set(el.project_id),
        stage_id: Set(stage_id),
        task_id: Set(defaults.task_id),
        assigned_to: Set(defaults.assigned_to),
        qc_id: Set(defaults.qc_id),
        paper_id: Set(defaults.paper_id),
        completed: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    set_statuses(&mut active, &ActivityStatuses::in_progress());
    Ok(active.insert(conn).await?)
}

/// Puts open activities of the type that sit past the entry stage back on
/// the entry stage with fresh statuses and entry-stage staffing.
#[instrument(skip(conn, path))]
pub async fn reset_in_flight<C: ConnectionTrait>(
    conn: &C,
    element_type_id: i32,
    path: &StagePath,
) -> Result<Vec<i32>, ServiceError> {
    let entry = path.first();
    let ids: Vec<i32> = element::Entity::find()
        .filter(element::Column::ElementTypeId.eq(element_type_id))
        .filter(element::Column::Disabled.eq(false))
        .all(conn)
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();
    let latest = latest_activities(conn, &ids).await?;

    let stale: Vec<activity::Model> = latest
        .into_values()
        .filter(|a| !a.completed && a.stage_id != entry)
        .collect();
    if stale.is_empty() {
        return Ok(Vec::new());
    }

    let defaults = stage_defaults(conn, entry).await?;
    let now = Utc::now();
    let mut reset = Vec::with_capacity(stale.len());
    for act in stale {
        let element_id = act.element_id;
        let mut active: activity::ActiveModel = act.into();
        active.stage_id = Set(entry);
        active.task_id = Set(defaults.task_id);
        active.assigned_to = Set(defaults.assigned_to);
        active.qc_id = Set(defaults.qc_id);
        active.paper_id = Set(defaults.paper_id);
        set_statuses(&mut active, &ActivityStatuses::in_progress());
        active.updated_at = Set(now);
        active.update(conn).await?;
        reset.push(element_id);
    }
    reset.sort_unstable();
    Ok(reset)
}

/// Current stage of an element together with its sub-statuses.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ActivityView {
    pub id: i32,
    pub element_id: i32,
    pub stage_id: i32,
    pub stage_name: Option<String>,
    pub task_id: Option<i32>,
    pub assigned_to: Option<i32>,
    pub qc_id: Option<i32>,
    pub paper_id: Option<i32>,
    pub completed: bool,
    pub statuses: ActivityStatuses,
}

impl ActivityView {
    fn new(a: &activity::Model, stages: &HashMap<i32, project_stage::Model>) -> Self {
        Self {
            id: a.id,
            element_id: a.element_id,
            stage_id: a.stage_id,
            stage_name: stages.get(&a.stage_id).map(|s| s.name.clone()),
            task_id: a.task_id,
            assigned_to: a.assigned_to,
            qc_id: a.qc_id,
            paper_id: a.paper_id,
            completed: a.completed,
            statuses: statuses_of(a),
        }
    }
}

/// Result of a status update.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ActivityOutcome {
    pub activity: ActivityView,
    /// Stage finished by this update.
    pub completed_stage_id: Option<i32>,
    /// Activity opened at the following stage.
    pub next_activity: Option<ActivityView>,
    /// The element left its last stage.
    pub production_finished: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CompletedStage {
    pub stage_id: i32,
    pub stage_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub user_id: Option<i32>,
}

/// Production and stock history of one element.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Lifecycle {
    pub element_id: i32,
    pub element_name: String,
    pub element_type_id: i32,
    pub stage_path: Vec<i32>,
    pub in_stage: bool,
    pub disabled: bool,
    pub completed_stages: Vec<CompletedStage>,
    pub current_activity: Option<ActivityView>,
    pub stock_status: Option<StockStatus>,
}

/// Drives elements through the stage path of their type.
#[derive(Clone)]
pub struct StagePipeline {
    db: Arc<DbPool>,
    deadlines: Deadlines,
    events: EventSender,
}

impl StagePipeline {
    pub fn new(db: Arc<DbPool>, deadlines: Deadlines, events: EventSender) -> Self {
        Self {
            db,
            deadlines,
            events,
        }
    }

    /// Opens the entry-stage activity of an element.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn start_production(
        &self,
        session: &Session,
        element_id: i32,
    ) -> Result<(ActivityView, Vec<String>), ServiceError> {
        let db = self.db.as_ref();
        let scope = session.read_scope();

        let (view, el) = self
            .deadlines
            .run("start_production", async move {
                let txn = db.begin().await?;
                let el = require(
                    for_update(element::Entity::find_by_id(element_id), &txn)
                        .one(&txn)
                        .await?,
                    "element",
                    element_id,
                )?;
                check_project_access(&txn, &scope, el.project_id).await?;

                if el.disabled {
                    return Err(ServiceError::Conflict(format!(
                        "element {} is disabled",
                        element_id
                    )));
                }
                if el.in_stage {
                    return Err(ServiceError::Conflict(format!(
                        "element {} is already in production",
                        element_id
                    )));
                }

                let et = require(
                    element_type::Entity::find_by_id(el.element_type_id)
                        .one(&txn)
                        .await?,
                    "element type",
                    el.element_type_id,
                )?;
                let path = stage_path_of(&et)?;
                let act = open_activity(&txn, &el, path.first()).await?;

                let mut active: element::ActiveModel = el.clone().into();
                active.in_stage = Set(true);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;

                let stages = project_stages(&txn, el.project_id).await?;
                txn.commit().await?;
                Ok((ActivityView::new(&act, &stages), el))
            })
            .await?;

        info!(element_id, stage_id = view.stage_id, "production started");
        let warnings = self
            .events
            .send_or_warn(ActivityEvent::new(
                session,
                "element",
                "start_production",
                format!("started production of {}", el.element_name),
                Some(el.project_id),
            ))
            .into_iter()
            .collect();
        Ok((view, warnings))
    }

    /// Applies sub-status values to the open activity and advances the
    /// element when all of them are completed.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn update_activity(
        &self,
        session: &Session,
        element_id: i32,
        patch: StatusPatch,
    ) -> Result<ActivityOutcome, ServiceError> {
        if patch.is_empty() {
            return Err(ServiceError::InvalidInput(
                "at least one status must be given".into(),
            ));
        }
        let db = self.db.as_ref();
        let scope = session.read_scope();
        let actor = session.user_id;

        let (mut outcome, el) = self
            .deadlines
            .write("update_activity", async move {
                let txn = db.begin().await?;
                let el = require(
                    for_update(element::Entity::find_by_id(element_id), &txn)
                        .one(&txn)
                        .await?,
                    "element",
                    element_id,
                )?;
                check_project_access(&txn, &scope, el.project_id).await?;
                if el.disabled {
                    return Err(ServiceError::Conflict(format!(
                        "element {} is disabled",
                        element_id
                    )));
                }

                let current = latest_activities(&txn, &[el.id])
                    .await?
                    .remove(&el.id)
                    .filter(|a| !a.completed)
                    .ok_or_else(|| {
                        ServiceError::InvalidOperation(format!(
                            "element {} has no open activity",
                            element_id
                        ))
                    })?;

                let mut statuses = statuses_of(&current);
                if statuses.regresses(&patch) {
                    return Err(ServiceError::InvalidInput(
                        "completed statuses cannot be reopened".into(),
                    ));
                }
                statuses.apply(&patch);

                let et = require(
                    element_type::Entity::find_by_id(el.element_type_id)
                        .one(&txn)
                        .await?,
                    "element type",
                    el.element_type_id,
                )?;
                let path = stage_path_of(&et)?;
                if !path.contains(current.stage_id) {
                    return Err(ServiceError::InvariantViolation(format!(
                        "activity {} sits on stage {} outside path {}",
                        current.id, current.stage_id, path
                    )));
                }

                let stage_id = current.stage_id;
                let now = Utc::now();
                let advancing = statuses.all_completed();
                let mut active: activity::ActiveModel = current.into();
                set_statuses(&mut active, &statuses);
                active.updated_at = Set(now);
                if advancing {
                    active.completed = Set(true);
                }
                let updated = active.update(&txn).await?;

                let mut next = None;
                if advancing {
                    complete_production::ActiveModel {
                        element_id: Set(el.id),
                        element_type_id: Set(el.element_type_id),
                        project_id: Set(el.project_id),
                        stage_id: Set(stage_id),
                        user_id: Set(Some(actor)),
                        started_at: Set(now),
                        status: Set(Some(StatusValue::Completed.as_column().to_string())),
                        ..Default::default()
                    }
                    .insert(&txn)
                    .await?;

                    if let Some(following) = path.next(stage_id) {
                        next = Some(open_activity(&txn, &el, following).await?);
                    }
                }

                let stages = project_stages(&txn, el.project_id).await?;
                txn.commit().await?;

                Ok((
                    ActivityOutcome {
                        activity: ActivityView::new(&updated, &stages),
                        completed_stage_id: advancing.then_some(stage_id),
                        production_finished: advancing && next.is_none(),
                        next_activity: next.as_ref().map(|a| ActivityView::new(a, &stages)),
                        warnings: Vec::new(),
                    },
                    el,
                ))
            })
            .await?;

        if let Some(stage_id) = outcome.completed_stage_id {
            metrics::counter!("precast.pipeline.stage_completed", 1);
            info!(element_id, stage_id, finished = outcome.production_finished, "stage completed");
            let event = ActivityEvent::new(
                session,
                "element",
                "complete_stage",
                format!("{} completed stage {}", el.element_name, stage_id),
                Some(el.project_id),
            );
            outcome.warnings.extend(self.events.send_or_warn(event));
        } else {
            let event = ActivityEvent::new(
                session,
                "element",
                "update_activity",
                format!("updated activity of {}", el.element_name),
                Some(el.project_id),
            )
            .without_notification();
            outcome.warnings.extend(self.events.send_or_warn(event));
        }
        Ok(outcome)
    }

    /// Completed stages in order, the open activity and the stock status.
    #[instrument(skip(self, session), fields(user_id = session.user_id))]
    pub async fn lifecycle(&self, session: &Session, element_id: i32) -> Result<Lifecycle, ServiceError> {
        let db = self.db.as_ref();
        let scope = session.read_scope();

        self.deadlines
            .run("element_lifecycle", async move {
                let el = require(
                    element::Entity::find_by_id(element_id).one(db).await?,
                    "element",
                    element_id,
                )?;
                check_project_access(db, &scope, el.project_id).await?;

                let et = require(
                    element_type::Entity::find_by_id(el.element_type_id).one(db).await?,
                    "element type",
                    el.element_type_id,
                )?;
                let path = stage_path_of(&et)?;
                let stages = project_stages(db, el.project_id).await?;

                let completed_stages = complete_production::Entity::find()
                    .filter(complete_production::Column::ElementId.eq(el.id))
                    .order_by_asc(complete_production::Column::Id)
                    .all(db)
                    .await?
                    .into_iter()
                    .map(|cp| CompletedStage {
                        stage_id: cp.stage_id,
                        stage_name: stages.get(&cp.stage_id).map(|s| s.name.clone()),
                        started_at: cp.started_at,
                        user_id: cp.user_id,
                    })
                    .collect();

                let current_activity = latest_activities(db, &[el.id])
                    .await?
                    .remove(&el.id)
                    .filter(|a| !a.completed)
                    .map(|a| ActivityView::new(&a, &stages));

                let stock = precast_stock::Entity::find()
                    .filter(precast_stock::Column::ElementId.eq(el.id))
                    .one(db)
                    .await?;
                let stock_status = match stock {
                    Some(row) => {
                        let flags = StockFlags::from(&row);
                        if flags.status().is_none() {
                            warn!(element_id, ?flags, "stock flags match no status");
                        }
                        flags.status()
                    }
                    None => None,
                };

                Ok(Lifecycle {
                    element_id: el.id,
                    element_name: el.element_name,
                    element_type_id: el.element_type_id,
                    stage_path: path.stages().to_vec(),
                    in_stage: el.in_stage,
                    disabled: el.disabled,
                    completed_stages,
                    current_activity,
                    stock_status,
                })
            })
            .await
    }
}
