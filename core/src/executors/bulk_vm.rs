//! Bulk VM executor: sequential per-domain graceful shutdown.
//!
//! `VMManager` exposes no start/restart primitive, so unlike bulk container
//! this executor only ever shuts domains down; the `operation` parameter
//! exists for wire-format symmetry with bulk container but is validated to
//! be `shutdown`.

use crate::callback_system::{CallbackSender, ProgressUpdate};
use crate::collaborators::VMManager;
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

#[derive(Debug, Clone, Serialize)]
struct VmResult {
    name: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub struct BulkVmExecutor {
    vms: Arc<dyn VMManager>,
    per_item_timeout: Duration,
}

impl BulkVmExecutor {
    pub fn new(vms: Arc<dyn VMManager>, per_item_timeout: Duration) -> Self {
        Self { vms, per_item_timeout }
    }
}

#[async_trait]
impl OperationExecutor for BulkVmExecutor {
    fn operation_type(&self) -> OperationType {
        OperationType::BulkVm
    }

    async fn execute(
        &self,
        record: &OperationRecord,
        params: &HashMap<String, Value>,
        callback: Arc<dyn CallbackSender>,
    ) -> Result<Option<Value>> {
        let names: Vec<String> = params
            .get("vm_names")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        if names.is_empty() {
            return Err(AgentError::Validation("vm_names must be non-empty".to_string()));
        }

        let operation = params.get("operation").and_then(Value::as_str).unwrap_or("shutdown");
        if operation != "shutdown" {
            return Err(AgentError::Validation(format!(
                "unsupported bulk vm operation '{operation}': only 'shutdown' is supported"
            )));
        }

        let total = names.len();
        let mut results = Vec::with_capacity(total);

        for (i, name) in names.into_iter().enumerate() {
            if record.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let outcome = tokio::time::timeout(self.per_item_timeout, self.vms.shutdown(&name)).await;
            let result = match outcome {
                Ok(Ok(())) => VmResult {
                    name: name.clone(),
                    success: true,
                    error: None,
                },
                Ok(Err(err)) => VmResult {
                    name: name.clone(),
                    success: false,
                    error: Some(err.to_string()),
                },
                Err(_) => VmResult {
                    name: name.clone(),
                    success: false,
                    error: Some("timed out".to_string()),
                },
            };

            let _ = callback
                .send_progress(ProgressUpdate::Output {
                    operation_id: record.id().to_string(),
                    line: format!("shutdown {}: {}", name, result.success),
                    is_error: !result.success,
                })
                .await;

            results.push(result);
            record.update_progress((((i + 1) as f64 / total as f64) * 100.0) as u8);
        }

        Ok(Some(serde_json::json!({
            "operation": "shutdown",
            "total": total,
            "results": results,
        })))
    }
}
