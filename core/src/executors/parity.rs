//! Parity check/correct executor: start the scan, then poll status every
//! `poll_interval` until it reports inactive.

use crate::array_orchestrator::{parity_kind_from_params, parity_priority_from_params};
use crate::callback_system::{CallbackSender, ProgressUpdate};
use crate::collaborators::Collaborators;
use crate::error::{AgentError, Result};
use crate::operation::record::OperationRecord;
use crate::operation::registry::OperationExecutor;
use crate::operation::types::OperationType;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct ParityExecutor {
    operation_type: OperationType,
    collaborators: Collaborators,
    poll_interval: Duration,
}

impl ParityExecutor {
    pub fn new(
        operation_type: OperationType,
        collaborators: Collaborators,
        poll_interval: Duration,
    ) -> Self {
        Self {
            operation_type,
            collaborators,
            poll_interval,
        }
    }
}

#[async_trait]
impl OperationExecutor for ParityExecutor {
    fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    fn is_long_running(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        record: &OperationRecord,
        params: &HashMap<String, Value>,
        callback: Arc<dyn CallbackSender>,
    ) -> Result<Option<Value>> {
        let kind = parity_kind_from_params(params);
        let priority = parity_priority_from_params(params);

        self.collaborators
            .storage
            .start_parity(kind, priority)
            .await
            .map_err(AgentError::External)?;

        loop {
            if record.is_cancelled() {
                let _ = self.collaborators.storage.cancel_parity().await;
                return Err(AgentError::Cancelled);
            }

            let status = self
                .collaborators
                .storage
                .parity_status()
                .await
                .map_err(AgentError::External)?;

            if let Some(percent) = status.progress {
                record.update_progress(percent);
                let _ = callback
                    .send_progress(ProgressUpdate::Progress {
                        operation_id: record.id().to_string(),
                        message: "parity scan in progress".to_string(),
                        percentage: Some(percent as f64),
                        current_step: None,
                    })
                    .await;
            }

            if !status.active {
                return Ok(Some(serde_json::to_value(&status).map_err(|e| {
                    AgentError::External(anyhow::anyhow!(e))
                })?));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
