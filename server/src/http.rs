//! HTTP routing for the operation manager and stream fan-out: an axum
//! `Router` wrapped in `TraceLayer`/`CorsLayer`, bound and served with
//! `axum::serve`. Request handling is a thin veneer over `OperationManager`.

use crate::error::Result;
use crate::ws;
use arrayd_core::{OperationFilter, OperationManager, OperationRequest, OperationStatus, OperationType};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<OperationManager>,
    pub fanout: Arc<arrayd_core::StreamFanout>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/operations", post(start_operation).get(list_operations))
        .route("/api/operations/{id}", get(get_operation))
        .route("/api/operations/{id}/cancel", post(cancel_operation))
        .route("/api/stats", get(stats))
        .route("/ws", get(ws::upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn start_operation(
    State(state): State<AppState>,
    Json(request): Json<OperationRequest>,
) -> Result<impl IntoResponse> {
    let snapshot = state.manager.start_operation(request).await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct ListOperationsQuery {
    status: Option<OperationStatus>,
    operation_type: Option<OperationType>,
}

async fn list_operations(
    State(state): State<AppState>,
    Query(query): Query<ListOperationsQuery>,
) -> impl IntoResponse {
    let filter = OperationFilter {
        status: query.status,
        operation_type: query.operation_type,
    };
    Json(state.manager.list_operations(filter).await)
}

async fn get_operation(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse> {
    let snapshot = state.manager.get_operation(&id).await?;
    Ok(Json(snapshot))
}

async fn cancel_operation(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse> {
    state.manager.cancel_operation(&id).await?;
    Ok(Json(serde_json::json!({"id": id, "cancelled": true})))
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "operations": state.manager.stats().await,
        "stream": state.fanout.stats_precise().await,
    }))
}
