//! Bulk Container executor: sequential per-container start/stop/restart
//! with a per-container timeout, progress proportional to items completed.

use crate::callback_system::{CallbackSender, ProgressUpdate};
use crate::collaborators::ContainerManager;
use crate::error::{AgentError, Result};
use crate::operation::record::OperationRecord;
use crate::operation::registry::OperationExecutor;
use crate::operation::types::OperationType;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerOp {
    Start,
    Stop,
    Restart,
}

impl ContainerOp {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "start" => Ok(ContainerOp::Start),
            "stop" => Ok(ContainerOp::Stop),
            "restart" => Ok(ContainerOp::Restart),
            other => Err(AgentError::Validation(format!("unknown bulk container operation '{other}'"))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ContainerOp::Start => "start",
            ContainerOp::Stop => "stop",
            ContainerOp::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ContainerResult {
    id: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub struct BulkContainerExecutor {
    containers: Arc<dyn ContainerManager>,
    per_item_timeout: Duration,
}

impl BulkContainerExecutor {
    pub fn new(containers: Arc<dyn ContainerManager>, per_item_timeout: Duration) -> Self {
        Self {
            containers,
            per_item_timeout,
        }
    }
}

#[async_trait]
impl OperationExecutor for BulkContainerExecutor {
    fn operation_type(&self) -> OperationType {
        OperationType::BulkContainer
    }

    async fn execute(
        &self,
        record: &OperationRecord,
        params: &HashMap<String, Value>,
        callback: Arc<dyn CallbackSender>,
    ) -> Result<Option<Value>> {
        let ids: Vec<String> = params
            .get("container_ids")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        if ids.is_empty() {
            return Err(AgentError::Validation("container_ids must be non-empty".to_string()));
        }

        let op = ContainerOp::parse(
            params
                .get("operation")
                .and_then(Value::as_str)
                .unwrap_or("stop"),
        )?;

        let total = ids.len();
        let mut results = Vec::with_capacity(total);

        for (i, id) in ids.into_iter().enumerate() {
            if record.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let outcome = tokio::time::timeout(self.per_item_timeout, async {
                match op {
                    ContainerOp::Start => self.containers.start(&id).await,
                    ContainerOp::Stop => self.containers.stop(&id, self.per_item_timeout).await,
                    ContainerOp::Restart => self.containers.restart(&id, self.per_item_timeout).await,
                }
            })
            .await;

            let result = match outcome {
                Ok(Ok(())) => ContainerResult {
                    id: id.clone(),
                    success: true,
                    error: None,
                },
                Ok(Err(err)) => ContainerResult {
                    id: id.clone(),
                    success: false,
                    error: Some(err.to_string()),
                },
                Err(_) => ContainerResult {
                    id: id.clone(),
                    success: false,
                    error: Some("timed out".to_string()),
                },
            };

            let _ = callback
                .send_progress(ProgressUpdate::Output {
                    operation_id: record.id().to_string(),
                    line: format!("{} {}: {}", op.as_str(), id, result.success),
                    is_error: !result.success,
                })
                .await;

            results.push(result);

            let percent = (((i + 1) as f64 / total as f64) * 100.0) as u8;
            record.update_progress(percent);
        }

        Ok(Some(serde_json::json!({
            "operation": op.as_str(),
            "total": total,
            "results": results,
        })))
    }
}
