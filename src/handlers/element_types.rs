use crate::{
    auth::Session,
    errors::ServiceError,
    handlers::common::{created_response, json_body, success_response, ListParams, Paginated},
    services::element_types::{CreateElementTypeInput, UpdateElementTypeInput},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ElementTypeFilter {
    pub project_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ElementFilter {
    #[serde(default)]
    pub include_disabled: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/element-types",
            get(list_element_types).post(create_element_type),
        )
        .route(
            "/element-types/:id",
            get(get_element_type)
                .put(update_element_type)
                .delete(delete_element_type),
        )
        .route("/element-types/:id/elements", get(list_elements))
        .route("/element-types/:id/stock-counts", get(stock_counts))
}

/// Create an element type and materialise its elements
#[utoipa::path(
    post,
    path = "/api/v1/element-types",
    request_body = CreateElementTypeInput,
    responses(
        (status = 201, description = "Element type created", body = crate::services::element_types::CreatedElementType,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate type code", body = crate::errors::ErrorResponse)
    ),
    tag = "element-types"
)]
pub async fn create_element_type(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<CreateElementTypeInput>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = json_body(body)?;
    let created = state.services.element_types.create(&session, input).await?;
    Ok(created_response(created))
}

/// List element types visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/element-types",
    params(ElementTypeFilter, ListParams),
    responses(
        (status = 200, description = "Page of element types"),
        (status = 400, description = "Invalid pagination", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "element-types"
)]
pub async fn list_element_types(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<ElementTypeFilter>,
    Query(list): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, page_size) = list.resolve()?;
    let (rows, total) = state
        .services
        .element_types
        .list(&session, filter.project_id, page, page_size)
        .await?;
    Ok(Paginated::new(rows, page, page_size, total))
}

/// Get an element type with hierarchy, drawings and BOM
#[utoipa::path(
    get,
    path = "/api/v1/element-types/{id}",
    params(("id" = i32, Path, description = "Element type ID")),
    responses(
        (status = 200, description = "Element type details", body = crate::services::element_types::ElementTypeDetail),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "element-types"
)]
pub async fn get_element_type(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let detail = state.services.element_types.get(&session, id).await?;
    Ok(success_response(detail))
}

/// Revise an element type and propagate the change to its elements
#[utoipa::path(
    put,
    path = "/api/v1/element-types/{id}",
    params(("id" = i32, Path, description = "Element type ID")),
    request_body = UpdateElementTypeInput,
    responses(
        (status = 200, description = "Revision applied", body = crate::services::element_types::UpdateOutcome),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "element-types"
)]
pub async fn update_element_type(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    body: Result<Json<UpdateElementTypeInput>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let patch = json_body(body)?;
    let outcome = state
        .services
        .element_types
        .update(&session, id, patch)
        .await?;
    Ok(success_response(outcome))
}

/// Delete an element type according to the configured policy
#[utoipa::path(
    delete,
    path = "/api/v1/element-types/{id}",
    params(("id" = i32, Path, description = "Element type ID")),
    responses(
        (status = 200, description = "Element type deleted", body = crate::services::element_types::DeleteOutcome),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "element-types"
)]
pub async fn delete_element_type(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state.services.element_types.delete(&session, id).await?;
    Ok(success_response(outcome))
}

/// List the elements of a type
#[utoipa::path(
    get,
    path = "/api/v1/element-types/{id}/elements",
    params(("id" = i32, Path, description = "Element type ID"), ElementFilter, ListParams),
    responses(
        (status = 200, description = "Page of elements"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "element-types"
)]
pub async fn list_elements(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Query(filter): Query<ElementFilter>,
    Query(list): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, page_size) = list.resolve()?;
    let (rows, total) = state
        .services
        .elements
        .list_for_type(&session, id, filter.include_disabled, page, page_size)
        .await?;
    Ok(Paginated::new(rows, page, page_size, total))
}

/// Per-location stock counts of a type
#[utoipa::path(
    get,
    path = "/api/v1/element-types/{id}/stock-counts",
    params(("id" = i32, Path, description = "Element type ID")),
    responses(
        (status = 200, description = "Counts per tower and floor", body = [crate::services::stock::LocationCounts]),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "element-types"
)]
pub async fn stock_counts(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let counts = state.services.stock.counts(&session, id).await?;
    Ok(success_response(counts))
}
