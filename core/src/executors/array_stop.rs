//! Array Stop executor: a thin wrapper invoking the array orchestrator.

use crate::array_orchestrator::{self, StopParams};
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

pub struct ArrayStopExecutor {
    collaborators: Collaborators,
    state_poll_interval: Duration,
    stop_timeout: Duration,
    container_timeout: Duration,
    vm_timeout: Duration,
}

impl ArrayStopExecutor {
    pub fn new(
        collaborators: Collaborators,
        state_poll_interval: Duration,
        stop_timeout: Duration,
        container_timeout: Duration,
        vm_timeout: Duration,
    ) -> Self {
        Self {
            collaborators,
            state_poll_interval,
            stop_timeout,
            container_timeout,
            vm_timeout,
        }
    }
}

fn bool_param(params: &HashMap<String, Value>, key: &str, default: bool) -> bool {
    params.get(key).and_then(Value::as_bool).unwrap_or(default)
}

#[async_trait]
impl OperationExecutor for ArrayStopExecutor {
    fn operation_type(&self) -> OperationType {
        OperationType::ArrayStop
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
        let stop_params = StopParams {
            force: bool_param(params, "force", false),
            unmount_shares: bool_param(params, "unmount_shares", true),
            stop_containers: bool_param(params, "stop_containers", true),
            stop_vms: bool_param(params, "stop_vms", true),
        };

        let result = array_orchestrator::stop(
            record,
            &self.collaborators,
            stop_params,
            self.state_poll_interval,
            self.stop_timeout,
            self.container_timeout,
            self.vm_timeout,
        )
        .await?;

        Ok(Some(result))
    }
}
