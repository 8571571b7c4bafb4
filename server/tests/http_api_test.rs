//! Integration tests driving the HTTP surface in-process with `tower`'s
//! `ServiceExt::oneshot`, rather than spawning the real binary over a socket.

use arrayd_core::{Collaborators, ManagerConfig, OperationManager, StreamFanout};
use arrayd_server::demo_collaborators::{
    DemoContainerManager, DemoMetricsCollector, DemoStorageDriver, DemoSystemController, DemoVmManager,
};
use arrayd_server::{AppState, build_router};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn test_app() -> axum::Router {
    let collaborators = Collaborators {
        storage: DemoStorageDriver::new(),
        containers: DemoContainerManager::new(),
        vms: DemoVmManager::new(),
        system: DemoSystemController::new(),
        metrics: DemoMetricsCollector::new(),
    };
    let config = ManagerConfig::default();
    let registry = arrayd_core::build_default_registry(collaborators.clone(), &config).await;
    let manager = OperationManager::new(config.clone(), registry);
    let fanout = StreamFanout::new(
        collaborators.metrics.clone(),
        config.stream_tick_interval(),
        config.stream_default_interval(),
        config.stream_client_queue_capacity,
    );
    build_router(AppState { manager, fanout })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn start_and_fetch_operation_round_trips() {
    let app = test_app().await;
    let request_body = json!({"operation_type": "smart_scan"});
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/operations")
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = body_json(response).await;
    let id = snapshot["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/operations/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["id"], id);
}

#[tokio::test]
async fn unknown_operation_is_404() {
    let app = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/operations/op-does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn conflicting_operation_is_409() {
    let app = test_app().await;
    let request_body = json!({"operation_type": "array_start"});

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/operations")
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/operations")
                .header("content-type", "application/json")
                .body(Body::from(request_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn stats_reports_operation_and_stream_counters() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["operations"]["max_active_operations"].is_number());
    assert!(body["stream"]["connected_clients"].is_number());
}
