use crate::{
    auth::Session,
    errors::ServiceError,
    handlers::common::{json_body, success_response, validate_input},
    models::StockAction,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockTransitionRequest {
    #[validate(length(min = 1, max = 500))]
    #[serde(deserialize_with = "crate::models::lenient::vec_i32_from_any")]
    #[schema(value_type = Vec<i32>)]
    pub element_ids: Vec<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/stock/:action", post(transition))
}

/// Apply one stock transition to a batch of elements, all or nothing
#[utoipa::path(
    post,
    path = "/api/v1/stock/{action}",
    params(("action" = StockAction, Path, description = "receive_in_stockyard, request_erection, dispatch, receive_at_site or erect")),
    request_body = StockTransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = crate::services::stock::StockTransition),
        (status = 400, description = "Unknown action or guard failed", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Element or stock row missing", body = crate::errors::ErrorResponse),
        (status = 409, description = "Element already in stock", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn transition(
    State(state): State<AppState>,
    session: Session,
    Path(action): Path<String>,
    body: Result<Json<StockTransitionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let action = StockAction::from_str(&action)
        .map_err(|_| ServiceError::BadRequest(format!("unknown stock action '{}'", action)))?;
    let request = json_body(body)?;
    validate_input(&request)?;

    let result = state
        .services
        .stock
        .transition(&session, action, request.element_ids)
        .await?;
    Ok(success_response(result))
}
