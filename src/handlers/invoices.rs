use crate::{
    auth::Session,
    errors::ServiceError,
    handlers::common::{
        created_response, json_body, success_response, validate_input, ListParams, Paginated,
    },
    models::StageKey,
    services::invoices::{CreateInvoiceInput, InvoiceEntry},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct InvoiceEntryRequest {
    #[serde(deserialize_with = "crate::models::lenient::i32_from_any")]
    #[schema(value_type = i32)]
    pub element_id: i32,
    /// `casted`, `dispatch` (or `dispatched`), `erection` or `handover`
    #[validate(length(min = 1, max = 32))]
    pub stage: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    #[serde(deserialize_with = "crate::models::lenient::i32_from_any")]
    #[schema(value_type = i32)]
    pub work_order_id: i32,
    #[validate(length(max = 1024))]
    pub billing_address: Option<String>,
    #[validate(length(max = 1024))]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub in_draft: bool,
    #[validate]
    pub entries: Vec<InvoiceEntryRequest>,
}

impl CreateInvoiceRequest {
    fn into_input(self) -> Result<CreateInvoiceInput, ServiceError> {
        let entries = self
            .entries
            .into_iter()
            .map(|e| {
                StageKey::normalize(&e.stage)
                    .map(|stage| InvoiceEntry {
                        element_id: e.element_id,
                        stage,
                    })
                    .ok_or_else(|| {
                        ServiceError::InvalidInput(format!("unknown invoice stage '{}'", e.stage))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CreateInvoiceInput {
            work_order_id: self.work_order_id,
            billing_address: self.billing_address,
            shipping_address: self.shipping_address,
            in_draft: self.in_draft,
            entries,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentRequest {
    #[schema(value_type = f64)]
    pub amount: Decimal,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceFilter {
    pub work_order_id: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route("/invoices/:id/breakdown", get(breakdown))
        .route("/invoices/:id/payments", post(record_payment))
}

/// Bill elements at the stages they reached
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = crate::services::invoices::InvoiceView),
        (status = 400, description = "Invalid entries or stage not reached", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Element already invoiced at that stage", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_body(body)?;
    validate_input(&request)?;
    let invoice = state
        .services
        .invoices
        .create_invoice(&session, request.into_input()?)
        .await?;
    Ok(created_response(invoice))
}

/// Invoices visible to admins, newest first
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(InvoiceFilter, ListParams),
    responses(
        (status = 200, description = "Page of invoices"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Role may not list invoices", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    session: Session,
    Query(filter): Query<InvoiceFilter>,
    Query(list): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (page, page_size) = list.resolve()?;
    let (rows, total) = state
        .services
        .invoices
        .list_invoices(&session, filter.work_order_id, page, page_size)
        .await?;
    Ok(Paginated::new(rows, page, page_size, total))
}

/// Stage-wise breakdown of an invoice
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}/breakdown",
    params(("id" = i32, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Breakdown per stage, type and location", body = crate::services::invoices::InvoiceBreakdown),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn breakdown(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let view = state.services.invoices.breakdown(&session, id).await?;
    Ok(success_response(view))
}

/// Record a payment against an invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/payments",
    params(("id" = i32, Path, description = "Invoice ID")),
    request_body = PaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = crate::services::invoices::InvoiceView),
        (status = 400, description = "Amount must be positive", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    body: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let request = json_body(body)?;
    let invoice = state
        .services
        .invoices
        .record_payment(&session, id, request.amount, request.reference)
        .await?;
    Ok(created_response(invoice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request(stages: &[&str]) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            work_order_id: 1,
            billing_address: None,
            shipping_address: None,
            in_draft: false,
            entries: stages
                .iter()
                .enumerate()
                .map(|(i, s)| InvoiceEntryRequest {
                    element_id: i as i32 + 1,
                    stage: s.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn stage_names_are_normalised() {
        let input = request(&["Casted", "dispatched", " ERECTION "]).into_input().unwrap();
        let stages: Vec<StageKey> = input.entries.iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![StageKey::Casted, StageKey::Dispatch, StageKey::Erection]
        );
    }

    #[test]
    fn unknown_stage_is_rejected() {
        assert_matches!(
            request(&["casted", "painted"]).into_input(),
            Err(ServiceError::InvalidInput(msg)) if msg.contains("painted")
        );
    }

    #[test]
    fn oversized_address_fails_validation() {
        let mut req = request(&["casted"]);
        assert!(req.validate().is_ok());
        req.billing_address = Some("x".repeat(2000));
        assert!(req.validate().is_err());
    }
}
