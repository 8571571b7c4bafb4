//! Array Start executor: a thin wrapper invoking the array orchestrator.

use crate::array_orchestrator::{self, StartParams};
use crate::callback_system::CallbackSender;
use crate::collaborators::Collaborators;
use crate::error::Result;
use crate::operation::record::OperationRecord;
use crate::operation::registry::OperationExecutor;
use crate::operation::types::OperationType;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub struct ArrayStartExecutor {
    collaborators: Collaborators,
    state_poll_interval: Duration,
    start_timeout: Duration,
}

impl ArrayStartExecutor {
    pub fn new(collaborators: Collaborators, state_poll_interval: Duration, start_timeout: Duration) -> Self {
        Self {
            collaborators,
            state_poll_interval,
            start_timeout,
        }
    }
}

#[async_trait]
impl OperationExecutor for ArrayStartExecutor {
    fn operation_type(&self) -> OperationType {
        OperationType::ArrayStart
    }

    fn is_long_running(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        record: &OperationRecord,
        params: &HashMap<String, Value>,
        _callback: Arc<dyn CallbackSender>,
    ) -> Result<Option<Value>> {
        let start_params = StartParams {
            maintenance_mode: params.get("maintenance_mode").and_then(Value::as_bool).unwrap_or(false),
            check_filesystem: params.get("check_filesystem").and_then(Value::as_bool).unwrap_or(false),
        };

        let result = array_orchestrator::start(
            record,
            &self.collaborators,
            start_params,
            self.state_poll_interval,
            self.start_timeout,
        )
        .await?;

        Ok(Some(result))
    }
}
