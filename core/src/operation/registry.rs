//! The executor registry: binds an [`OperationType`] to the
//! [`OperationExecutor`] that performs it.

use super::record::OperationRecord;
use super::types::OperationType;
use crate::callback_system::CallbackSender;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The work an operation type performs. Implementations must honor the
/// record's cancellation token at every suspension point, and must not set
/// the record's terminal status themselves when cancellation fires — that
/// bookkeeping belongs to the manager, which observes the outcome of
/// `execute` and reconciles it against whether the token was cancelled.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    fn operation_type(&self) -> OperationType;

    /// A hint used for reporting purposes; does not affect scheduling.
    fn is_long_running(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        record: &OperationRecord,
        params: &HashMap<String, Value>,
        callback: Arc<dyn CallbackSender>,
    ) -> Result<Option<Value>>;
}

/// Name -> executor mapping. Lookups never block on registration, which in
/// practice only happens at startup, but the contract allows late
/// (re-)registration: the last registration for a given type wins.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: RwLock<HashMap<OperationType, Arc<dyn OperationExecutor>>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, executor: Arc<dyn OperationExecutor>) {
        let operation_type = executor.operation_type();
        self.executors.write().await.insert(operation_type, executor);
    }

    pub async fn get(&self, operation_type: OperationType) -> Option<Arc<dyn OperationExecutor>> {
        self.executors.read().await.get(&operation_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubExecutor;

    #[async_trait]
    impl OperationExecutor for StubExecutor {
        fn operation_type(&self) -> OperationType {
            OperationType::SmartScan
        }

        async fn execute(
            &self,
            _record: &OperationRecord,
            _params: &HashMap<String, Value>,
            _callback: Arc<dyn CallbackSender>,
        ) -> Result<Option<Value>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn register_and_lookup_round_trips() {
        let registry = ExecutorRegistry::new();
        assert!(registry.get(OperationType::SmartScan).await.is_none());
        registry.register(Arc::new(StubExecutor)).await;
        assert!(registry.get(OperationType::SmartScan).await.is_some());
        assert!(registry.get(OperationType::ArrayStart).await.is_none());
    }

    #[tokio::test]
    async fn later_registration_overwrites_earlier() {
        let registry = ExecutorRegistry::new();
        registry.register(Arc::new(StubExecutor)).await;
        registry.register(Arc::new(StubExecutor)).await;
        assert!(registry.get(OperationType::SmartScan).await.is_some());
    }
}
