use crate::handlers::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub environment: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub database: ComponentHealth,
    pub activity_channel: ComponentHealth,
    pub response_time_ms: u128,
}

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Records process start for the uptime figure.
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(liveness))
        .route("/status", get(status))
}

/// Liveness: the process answers.
async fn liveness() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Database reachability and activity channel headroom. A down database
/// answers 503; a saturated or closed channel only degrades.
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let db_start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let database = ComponentHealth {
        status: if db_result.is_ok() {
            ComponentStatus::Up
        } else {
            ComponentStatus::Down
        },
        message: db_result.map_or_else(
            |e| format!("Connection failed: {}", e),
            |_| "Connection successful".to_string(),
        ),
        latency_ms: Some(db_start.elapsed().as_millis() as u64),
    };

    let (free, max) = state.event_sender.headroom();
    let activity_channel = if state.event_sender.is_closed() {
        ComponentHealth {
            status: ComponentStatus::Down,
            message: "activity projector has stopped".into(),
            latency_ms: None,
        }
    } else {
        ComponentHealth {
            status: if free == 0 {
                ComponentStatus::Degraded
            } else {
                ComponentStatus::Up
            },
            message: format!("{} of {} slots free", free, max),
            latency_ms: None,
        }
    };

    let overall = match (database.status, activity_channel.status) {
        (ComponentStatus::Down, _) => ComponentStatus::Down,
        (_, ComponentStatus::Up) => ComponentStatus::Up,
        _ => ComponentStatus::Degraded,
    };
    let code = if overall == ComponentStatus::Down {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let body = StatusResponse {
        status: overall,
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: uptime_secs(),
        database,
        activity_channel,
        response_time_ms: start.elapsed().as_millis(),
    };
    (code, Json(body))
}
