//! Error types for the `arrayd-server` HTTP/WebSocket binding.

use arrayd_core::AgentError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP server error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::Agent(AgentError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::Agent(AgentError::NoExecutor(_)) => (StatusCode::BAD_REQUEST, "no_executor"),
            ServerError::Agent(AgentError::ConflictingOperation { .. }) => (StatusCode::CONFLICT, "conflicting_operation"),
            ServerError::Agent(AgentError::Capacity { .. }) => (StatusCode::TOO_MANY_REQUESTS, "capacity"),
            ServerError::Agent(AgentError::NotCancellable) => (StatusCode::CONFLICT, "not_cancellable"),
            ServerError::Agent(AgentError::AlreadyTerminal) => (StatusCode::CONFLICT, "already_terminal"),
            ServerError::Agent(AgentError::Validation(_)) => (StatusCode::BAD_REQUEST, "validation"),
            ServerError::Agent(AgentError::Timeout(_)) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            ServerError::Agent(AgentError::External(_)) => (StatusCode::BAD_GATEWAY, "external"),
            ServerError::Agent(AgentError::Cancelled) => (StatusCode::CONFLICT, "cancelled"),
            ServerError::Io(_) | ServerError::Json(_) | ServerError::Http(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        let body = Json(serde_json::json!({
            "error": code,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
