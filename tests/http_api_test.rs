//! The HTTP surface: session header, status codes and envelopes.

mod common;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use common::*;
use precast_api::api_router;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn router() -> (TestApp, Router) {
    let app = TestApp::new().await;
    let router = api_router(app.state.clone());
    (app, router)
}

fn wall_body() -> Value {
    json!({
        "project_id": PROJECT,
        "element_type": "WALL",
        "element_type_name": "Load bearing wall",
        "volume": 2,
        "mass": 4800,
        "stage_path": [CASTING, DISPATCH],
        "hierarchy": [{ "hierarchy_id": FLOOR_A, "quantity": 2 }]
    })
}

// ==================== Session header ====================

#[tokio::test]
async fn missing_or_expired_session_is_unauthorized() {
    let (_app, router) = router().await;

    let response = router
        .clone()
        .oneshot(request(Method::GET, "/api/v1/element-types", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert!(body["message"].is_string());

    let response = router
        .oneshot(request(Method::GET, "/api/v1/element-types", Some("tok-expired"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn planner_cannot_list_invoices() {
    let (_app, router) = router().await;
    let response = router
        .oneshot(request(Method::GET, "/api/v1/invoices", Some(PLANNER_TOKEN), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ==================== Element types ====================

#[tokio::test]
async fn create_answers_201_with_envelope() {
    let (_app, router) = router().await;

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/v1/element-types",
            Some(ADMIN_TOKEN),
            Some(wall_body()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["element_ids"].as_array().map(Vec::len), Some(2));
    let id = body["data"]["element_type"]["element_type_id"].as_i64().unwrap();

    let response = router
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/element-types/{}/elements", id),
            Some(PLANNER_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = response_json(response).await;
    assert_eq!(page["pagination"]["total_records"], json!(2));
    assert_eq!(page["data"][0]["element_name"], json!("T1-F1-W-1"));

    let response = router
        .oneshot(request(
            Method::GET,
            "/api/v1/element-types?page_size=500",
            Some(ADMIN_TOKEN),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (_app, router) = router().await;
    let response = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/element-types")
                .header(header::AUTHORIZATION, ADMIN_TOKEN)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"project_id\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_stock_action_is_a_bad_request() {
    let (_app, router) = router().await;
    let response = router
        .oneshot(request(
            Method::POST,
            "/api/v1/stock/teleport",
            Some(ADMIN_TOKEN),
            Some(json!({ "element_ids": [1] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==================== Operational routes ====================

#[tokio::test]
async fn health_and_openapi_need_no_session() {
    let (_app, router) = router().await;

    let response = router
        .clone()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(request(Method::GET, "/status", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = response_json(response).await;
    assert_eq!(status["database"]["status"], json!("up"));

    let response = router
        .oneshot(request(Method::GET, "/api-docs/openapi.json", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = response_json(response).await;
    assert!(doc["paths"]["/api/v1/stock/{action}"].is_object());
}
