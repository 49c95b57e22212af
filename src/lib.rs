//! Precast API Library
//!
//! Element type revisions and their propagation to element instances,
//! production stages, stockyard lifecycle and stage-wise invoicing.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{http::HeaderValue, response::Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::ToSchema;

use crate::db::DbPool;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires every service against one pool, one config and one event
    /// channel.
    pub fn new(db: Arc<DbPool>, config: config::AppConfig, event_sender: events::EventSender) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config, event_sender.clone());
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    pub(crate) fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api/v1` route. Authentication happens per handler through the
/// [`auth::Session`] extractor.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::element_types::routes())
        .merge(handlers::elements::routes())
        .merge(handlers::stock::routes())
        .merge(handlers::work_orders::routes())
        .merge(handlers::invoices::routes())
}

/// CORS from `cors_allowed_origins`. Without a list, development runs
/// permissive and everything else stays same-origin.
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let configured: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !configured.is_empty() {
        CorsLayer::new()
            .allow_origin(configured)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.is_development() {
        ::tracing::info!("using permissive CORS in development");
        CorsLayer::permissive()
    } else {
        ::tracing::warn!("no CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// The full application: health probes, OpenAPI document and the v1 API
/// behind request ids, HTTP tracing and CORS.
pub fn api_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .merge(handlers::health::routes())
        .merge(openapi::routes())
        .nest("/api/v1", api_v1_routes())
        .layer(cors)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn message_response_carries_no_data() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-msg"), async {
                ApiResponse::<()>::message("deleted")
            })
            .await;

        assert!(response.success);
        assert!(response.data.is_none());
        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-msg"));
    }

    #[test]
    fn metadata_outside_a_request_has_no_id() {
        let meta = ResponseMeta::capture();
        assert!(meta.request_id.is_none());
        assert!(!meta.timestamp.is_empty());
    }

    #[test]
    fn cors_origins_are_parsed_from_a_comma_list() {
        let mut cfg = config::AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        );
        cfg.cors_allowed_origins = Some(" https://a.example , ,https://b.example".into());
        // Construction must not panic on blanks or whitespace.
        let _ = cors_layer(&cfg);
    }
}
