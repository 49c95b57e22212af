use crate::{
    auth::Session,
    errors::ServiceError,
    handlers::common::{json_body, success_response},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    routing::put,
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Stage name to percent, e.g. `{"casted": 40, "dispatch": 20, ...}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentTermRequest {
    #[schema(value_type = Object)]
    pub payment_term: BTreeMap<String, Decimal>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/work-orders/:id/payment-term", put(set_payment_term))
}

/// Replace the payment term of a work order; percents must sum to 100
#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}/payment-term",
    params(("id" = i32, Path, description = "Work order ID")),
    request_body = PaymentTermRequest,
    responses(
        (status = 200, description = "Payment term stored", body = crate::services::invoices::PaymentTermView),
        (status = 400, description = "Unknown stage or percents not summing to 100", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn set_payment_term(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    body: Result<Json<PaymentTermRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_body(body)?;
    let view = state
        .services
        .invoices
        .set_payment_term(&session, id, request.payment_term)
        .await?;
    Ok(success_response(view))
}
