//! `arrayd-core`: the asynchronous operation manager and array lifecycle
//! orchestrator behind a storage-appliance management agent.
//!
//! Two tightly coupled subsystems live here:
//!
//! - [`operation`]: a typed, cancellable, progress-reporting scheduler for
//!   long-running operations that enforces mutual exclusion between
//!   conflicting operation types and persists observable state for polling.
//! - [`array_orchestrator`]: the multi-step state machine that safely
//!   starts and stops the storage array, including dependency-ordered
//!   quiescence of containers, VMs, user shares, and per-disk mounts.
//!
//! [`executors`] binds concrete work to each operation type; [`stream`] is
//! the WebSocket fan-out that multiplexes operation and metrics telemetry
//! out to many subscribers. [`collaborators`] defines the external
//! interfaces (storage driver, container runtime, hypervisor, system power,
//! metrics) this crate depends on but does not implement — those live in
//! the `arrayd-server` binary crate (or, for tests, in [`test_utils`]).

pub mod array_orchestrator;
pub mod callback_system;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod executors;
pub mod operation;
pub mod retry;
pub mod stream;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

pub use collaborators::Collaborators;
pub use config::ManagerConfig;
pub use error::{AgentError, Result};
pub use operation::{
    ExecutorRegistry, OperationExecutor, OperationFilter, OperationManager, OperationRecord,
    OperationRequest, OperationSnapshot, OperationStats, OperationStatus, OperationType,
};
pub use stream::StreamFanout;

/// Build an [`ExecutorRegistry`](operation::ExecutorRegistry) with every
/// known operation type registered, wired to the given collaborators and
/// timing configuration.
///
/// `disk_scan` has no executor of its own in this crate: the source system
/// does not describe a distinct disk-scan algorithm beyond what the SMART
/// scan already covers, so `start_operation(disk_scan)` returns `no_executor`
/// until a caller registers one explicitly.
pub async fn build_default_registry(
    collaborators: Collaborators,
    config: &ManagerConfig,
) -> std::sync::Arc<operation::ExecutorRegistry> {
    let registry = std::sync::Arc::new(operation::ExecutorRegistry::new());

    registry
        .register(std::sync::Arc::new(executors::ParityExecutor::new(
            OperationType::ParityCheck,
            collaborators.clone(),
            config.parity_poll_interval(),
        )))
        .await;
    registry
        .register(std::sync::Arc::new(executors::ParityExecutor::new(
            OperationType::ParityCorrect,
            collaborators.clone(),
            config.parity_poll_interval(),
        )))
        .await;
    registry
        .register(std::sync::Arc::new(executors::ArrayStartExecutor::new(
            collaborators.clone(),
            config.array_state_poll_interval(),
            config.array_start_timeout(),
        )))
        .await;
    registry
        .register(std::sync::Arc::new(executors::ArrayStopExecutor::new(
            collaborators.clone(),
            config.array_state_poll_interval(),
            config.array_stop_timeout(),
            config.bulk_container_timeout(),
            config.bulk_vm_timeout(),
        )))
        .await;
    registry
        .register(std::sync::Arc::new(executors::BulkContainerExecutor::new(
            collaborators.containers.clone(),
            config.bulk_container_timeout(),
        )))
        .await;
    registry
        .register(std::sync::Arc::new(executors::BulkVmExecutor::new(
            collaborators.vms.clone(),
            config.bulk_vm_timeout(),
        )))
        .await;
    registry
        .register(std::sync::Arc::new(executors::SmartScanExecutor::new(collaborators.storage.clone())))
        .await;
    registry
        .register(std::sync::Arc::new(executors::RebootExecutor::new(collaborators.system.clone())))
        .await;
    registry
        .register(std::sync::Arc::new(executors::ShutdownExecutor::new(collaborators.system.clone())))
        .await;

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubCollaborators;

    #[tokio::test]
    async fn default_registry_covers_every_spec_executor() {
        let stub = StubCollaborators::new();
        let config = ManagerConfig::default();
        let registry = build_default_registry(stub.collaborators(), &config).await;

        for op_type in [
            OperationType::ParityCheck,
            OperationType::ParityCorrect,
            OperationType::ArrayStart,
            OperationType::ArrayStop,
            OperationType::BulkContainer,
            OperationType::BulkVm,
            OperationType::SmartScan,
            OperationType::SystemReboot,
            OperationType::SystemShutdown,
        ] {
            assert!(registry.get(op_type).await.is_some(), "missing executor for {op_type}");
        }
        assert!(registry.get(OperationType::DiskScan).await.is_none());
    }
}
