//! External collaborator interfaces.
//!
//! These traits are the boundary of the core: the storage driver, container
//! runtime, VM hypervisor, system power control, and metrics collection are
//! opaque providers from the core's point of view. Executors and the array
//! orchestrator depend only on these traits; concrete implementations (real
//! or process-backed) live in the `arrayd-server` binary crate, and
//! in-memory stub implementations for tests live in [`crate::test_utils`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A device assigned to the array, as recorded in the persisted disk
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceAssignment {
    pub device: String,
    pub slot: String,
}

/// Basic identifying information for a physical disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiskInfo {
    pub id: String,
    pub device: String,
}

/// A SMART attribute report for a single disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmartReport {
    pub disk_id: String,
    pub healthy: bool,
    pub temperature_celsius: Option<i32>,
    pub raw: String,
}

/// The current state of the multi-device array driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayState {
    Started,
    Stopped,
    Invalid,
    Unknown,
}

/// The state of an in-progress (or most recently run) parity operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParityStatus {
    pub active: bool,
    pub kind: Option<ParityKind>,
    pub progress: Option<u8>,
    pub speed: Option<String>,
    pub time_remaining: Option<String>,
    pub errors: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParityKind {
    Check,
    Correct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParityPriority {
    Low,
    Normal,
    High,
}

/// Whether an unmount should be attempted lazily first, or forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountMode {
    Lazy,
    Force,
}

/// Interface onto the storage/array subsystem: parity, array start/stop,
/// mount management, disk enumeration and SMART data.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    async fn start_parity(&self, kind: ParityKind, priority: ParityPriority) -> anyhow::Result<()>;
    async fn parity_status(&self) -> anyhow::Result<ParityStatus>;
    async fn cancel_parity(&self) -> anyhow::Result<()>;
    async fn is_parity_running(&self) -> anyhow::Result<bool>;

    async fn array_state(&self) -> anyhow::Result<ArrayState>;
    async fn driver_start(&self, maintenance: bool, check_filesystem: bool) -> anyhow::Result<()>;
    async fn driver_stop(&self, force: bool) -> anyhow::Result<()>;

    async fn list_array_mounts(&self) -> anyhow::Result<Vec<String>>;
    async fn user_share_mounts(&self) -> anyhow::Result<Vec<String>>;
    async fn unmount(&self, mountpoint: &str, mode: UnmountMode) -> anyhow::Result<()>;

    async fn disk_config(&self) -> anyhow::Result<Vec<DeviceAssignment>>;
    async fn list_disks(&self) -> anyhow::Result<Vec<DiskInfo>>;
    async fn smart_report(&self, disk_id: &str) -> anyhow::Result<SmartReport>;
}

/// Interface onto the container runtime.
#[async_trait]
pub trait ContainerManager: Send + Sync {
    async fn list_running(&self) -> anyhow::Result<Vec<String>>;
    async fn start(&self, id: &str) -> anyhow::Result<()>;
    async fn stop(&self, id: &str, timeout: Duration) -> anyhow::Result<()>;
    async fn restart(&self, id: &str, timeout: Duration) -> anyhow::Result<()>;
}

/// Interface onto the virtual machine hypervisor.
#[async_trait]
pub trait VMManager: Send + Sync {
    async fn list_running(&self) -> anyhow::Result<Vec<String>>;
    async fn shutdown(&self, name: &str) -> anyhow::Result<()>;
}

/// Interface onto whole-system power actions.
#[async_trait]
pub trait SystemController: Send + Sync {
    async fn reboot(&self) -> anyhow::Result<()>;
    async fn shutdown(&self) -> anyhow::Result<()>;
}

/// Interface onto the metrics collector backing the stream fan-out.
#[async_trait]
pub trait MetricsCollector: Send + Sync {
    async fn get(&self, metric_name: &str) -> anyhow::Result<Option<serde_json::Value>>;
}

/// The bundle of collaborators an [`crate::operation::ExecutorRegistry`]'s
/// executors and the array orchestrator are constructed from.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: std::sync::Arc<dyn StorageDriver>,
    pub containers: std::sync::Arc<dyn ContainerManager>,
    pub vms: std::sync::Arc<dyn VMManager>,
    pub system: std::sync::Arc<dyn SystemController>,
    pub metrics: std::sync::Arc<dyn MetricsCollector>,
}
