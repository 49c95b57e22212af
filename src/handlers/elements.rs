use crate::{
    auth::Session,
    errors::ServiceError,
    handlers::common::{created_response, json_body, success_response},
    models::StatusPatch,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductionStarted {
    pub activity: crate::services::pipeline::ActivityView,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/elements/:id/production", post(start_production))
        .route("/elements/:id/activity", put(update_activity))
        .route("/elements/:id/lifecycle", get(lifecycle))
        .route("/elements/:id/stock", get(stock_status))
}

/// Open the first stage of an element's production
#[utoipa::path(
    post,
    path = "/api/v1/elements/{id}/production",
    params(("id" = i32, Path, description = "Element ID")),
    responses(
        (status = 201, description = "Entry activity opened", body = ProductionStarted),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already in production or disabled", body = crate::errors::ErrorResponse)
    ),
    tag = "elements"
)]
pub async fn start_production(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let (activity, warnings) = state.services.pipeline.start_production(&session, id).await?;
    Ok(created_response(ProductionStarted { activity, warnings }))
}

/// Update the sub-statuses of the open activity
#[utoipa::path(
    put,
    path = "/api/v1/elements/{id}/activity",
    params(("id" = i32, Path, description = "Element ID")),
    request_body = StatusPatch,
    responses(
        (status = 200, description = "Activity updated", body = crate::services::pipeline::ActivityOutcome),
        (status = 400, description = "Empty or regressing patch, or no open activity", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "elements"
)]
pub async fn update_activity(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    body: Result<Json<StatusPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let patch = json_body(body)?;
    let outcome = state
        .services
        .pipeline
        .update_activity(&session, id, patch)
        .await?;
    Ok(success_response(outcome))
}

/// Completed stages, open activity and stock status of an element
#[utoipa::path(
    get,
    path = "/api/v1/elements/{id}/lifecycle",
    params(("id" = i32, Path, description = "Element ID")),
    responses(
        (status = 200, description = "Element lifecycle", body = crate::services::pipeline::Lifecycle),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "elements"
)]
pub async fn lifecycle(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state.services.pipeline.lifecycle(&session, id).await?;
    Ok(success_response(view))
}

/// Stock row of an element
#[utoipa::path(
    get,
    path = "/api/v1/elements/{id}/stock",
    params(("id" = i32, Path, description = "Element ID")),
    responses(
        (status = 200, description = "Stock flags and status", body = crate::services::stock::StockView),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Element not in stock", body = crate::errors::ErrorResponse)
    ),
    tag = "elements"
)]
pub async fn stock_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state.services.stock.status(&session, id).await?;
    Ok(success_response(view))
}
