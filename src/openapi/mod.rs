use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Precast API",
        version = "1.0.0",
        description = r#"
# Precast API

Element type revisions and their propagation to element instances,
production stages, stockyard lifecycle and stage-wise invoicing.

## Authentication

Every `/api/v1` endpoint needs a session token in the `Authorization`
header, with or without a `Bearer ` prefix.

## Pagination

List endpoints take `page` (from 1) and `page_size` or `limit` (1 to 100,
default 10) and answer `{data, pagination, meta}`.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SessionAuth),
    security(("session" = [])),
    tags(
        (name = "element-types", description = "Element type revisions and propagation"),
        (name = "elements", description = "Production stages of element instances"),
        (name = "stock", description = "Stockyard, dispatch and erection"),
        (name = "work-orders", description = "Payment terms"),
        (name = "invoices", description = "Stage-wise invoicing and payments")
    ),
    paths(
        crate::handlers::element_types::create_element_type,
        crate::handlers::element_types::list_element_types,
        crate::handlers::element_types::get_element_type,
        crate::handlers::element_types::update_element_type,
        crate::handlers::element_types::delete_element_type,
        crate::handlers::element_types::list_elements,
        crate::handlers::element_types::stock_counts,

        crate::handlers::elements::start_production,
        crate::handlers::elements::update_activity,
        crate::handlers::elements::lifecycle,
        crate::handlers::elements::stock_status,

        crate::handlers::stock::transition,

        crate::handlers::work_orders::set_payment_term,

        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::list_invoices,
        crate::handlers::invoices::breakdown,
        crate::handlers::invoices::record_payment,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::handlers::common::Pagination,

            crate::services::element_types::CreateElementTypeInput,
            crate::services::element_types::UpdateElementTypeInput,
            crate::services::element_types::HierarchyInput,
            crate::services::element_types::DrawingInput,
            crate::services::element_types::BomInput,
            crate::services::element_types::ElementTypeDetail,
            crate::services::element_types::ElementTypeSummary,
            crate::services::element_types::CreatedElementType,
            crate::services::element_types::UpdateOutcome,
            crate::services::element_types::DeleteOutcome,
            crate::services::elements::ElementView,
            crate::services::hierarchy::Location,

            crate::models::Geometry,
            crate::models::StatusPatch,
            crate::models::ActivityStatuses,
            crate::models::StockAction,
            crate::models::StockStatus,
            crate::models::StockFlags,
            crate::models::StageKey,
            crate::models::PaymentStatus,

            crate::services::pipeline::ActivityView,
            crate::services::pipeline::ActivityOutcome,
            crate::services::pipeline::Lifecycle,
            crate::handlers::elements::ProductionStarted,

            crate::handlers::stock::StockTransitionRequest,
            crate::services::stock::StockView,
            crate::services::stock::StockTransition,
            crate::services::stock::LocationCounts,

            crate::handlers::work_orders::PaymentTermRequest,
            crate::handlers::invoices::CreateInvoiceRequest,
            crate::handlers::invoices::InvoiceEntryRequest,
            crate::handlers::invoices::PaymentRequest,
            crate::services::invoices::PaymentTermView,
            crate::services::invoices::InvoiceView,
            crate::services::invoices::InvoiceBreakdown,
            crate::services::invoices::StageSummary,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

struct SessionAuth;

impl Modify for SessionAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Precast API"));
        assert!(json.contains("/api/v1/element-types/{id}"));
        assert!(json.contains("/api/v1/invoices/{id}/breakdown"));
        assert!(json.contains("\"session\""));
    }
}
