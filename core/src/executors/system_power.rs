//! System reboot/shutdown executors.
//!
//! Once dispatched, neither action can be meaningfully cancelled — the
//! underlying call has already been issued to the system collaborator.
//! Callers that want cancellation to mean something should submit these
//! requests with `cancellable: false`; `OperationManager::cancel_operation`
//! then rejects the attempt with `not_cancellable` rather than pretending to
//! stop a reboot already in flight. These executors never set terminal
//! status themselves beyond returning their result, consistent with every
//! other executor.

use crate::callback_system::CallbackSender;
use crate::collaborators::SystemController;
use crate::error::{AgentError, Result};
use crate::operation::record::OperationRecord;
use crate::operation::registry::OperationExecutor;
use crate::operation::types::OperationType;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct RebootExecutor {
    system: Arc<dyn SystemController>,
}

impl RebootExecutor {
    pub fn new(system: Arc<dyn SystemController>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl OperationExecutor for RebootExecutor {
    fn operation_type(&self) -> OperationType {
        OperationType::SystemReboot
    }

    fn is_long_running(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        record: &OperationRecord,
        _params: &HashMap<String, Value>,
        _callback: Arc<dyn CallbackSender>,
    ) -> Result<Option<Value>> {
        record.update_progress(50);
        self.system.reboot().await.map_err(AgentError::External)?;
        Ok(Some(serde_json::json!({"action": "reboot"})))
    }
}

pub struct ShutdownExecutor {
    system: Arc<dyn SystemController>,
}

impl ShutdownExecutor {
    pub fn new(system: Arc<dyn SystemController>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl OperationExecutor for ShutdownExecutor {
    fn operation_type(&self) -> OperationType {
        OperationType::SystemShutdown
    }

    fn is_long_running(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        record: &OperationRecord,
        _params: &HashMap<String, Value>,
        _callback: Arc<dyn CallbackSender>,
    ) -> Result<Option<Value>> {
        record.update_progress(50);
        self.system.shutdown().await.map_err(AgentError::External)?;
        Ok(Some(serde_json::json!({"action": "shutdown"})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback_system::NoOpCallbackSender;
    use crate::operation::types::OperationRequest;
    use crate::test_utils::StubSystemController;

    #[tokio::test]
    async fn reboot_invokes_the_system_controller() {
        let system = StubSystemController::new();
        let executor = RebootExecutor::new(system.clone());
        let record = OperationRecord::new("op-1".to_string(), OperationType::SystemReboot, "reboot".to_string(), false, None);
        executor
            .execute(&record, &HashMap::new(), Arc::new(NoOpCallbackSender))
            .await
            .unwrap();
        assert!(system.was_rebooted());
    }

    #[tokio::test]
    async fn shutdown_invokes_the_system_controller() {
        let system = StubSystemController::new();
        let executor = ShutdownExecutor::new(system.clone());
        let record = OperationRecord::new("op-1".to_string(), OperationType::SystemShutdown, "shutdown".to_string(), false, None);
        executor
            .execute(&record, &HashMap::new(), Arc::new(NoOpCallbackSender))
            .await
            .unwrap();
        assert!(system.was_shut_down());
    }

    #[test]
    fn non_cancellable_request_builder_is_available_for_power_actions() {
        let request = OperationRequest::new(OperationType::SystemReboot).non_cancellable();
        assert!(!request.cancellable);
    }
}
