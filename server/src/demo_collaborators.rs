//! Reference implementations of `arrayd-core`'s collaborator traits.
//!
//! The real SMART/ZFS/Docker/libvirt collectors are opaque providers the
//! core only ever sees through the `StorageDriver`/`ContainerManager`/
//! `VMManager`/`SystemController`/`MetricsCollector` traits. These
//! implementations stand in for them so the `arrayd` binary has something
//! to drive end to end: in-memory state, logged actions, and no contact
//! with real hardware, containers, or the kernel multi-device driver.

use arrayd_core::collaborators::{
    ArrayState, ContainerManager, DeviceAssignment, DiskInfo, MetricsCollector, ParityKind,
    ParityPriority, ParityStatus, SmartReport, StorageDriver, SystemController, UnmountMode, VMManager,
};
use arrayd_core::retry::{RetryConfig, execute_with_retry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

struct State {
    parity_active: bool,
    parity_kind: Option<ParityKind>,
    parity_progress: u8,
    array_state: ArrayState,
}

/// An in-process stand-in for the multi-device driver. Array start/stop
/// transitions happen instantly; parity advances a fixed amount each time
/// its status is polled, so `arrayd`'s WebSocket demo has something to show
/// without a real array underneath it.
pub struct DemoStorageDriver {
    state: Mutex<State>,
}

impl Default for DemoStorageDriver {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                parity_active: false,
                parity_kind: None,
                parity_progress: 0,
                array_state: ArrayState::Stopped,
            }),
        }
    }
}

impl DemoStorageDriver {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }
}

#[async_trait]
impl StorageDriver for DemoStorageDriver {
    async fn start_parity(&self, kind: ParityKind, priority: ParityPriority) -> anyhow::Result<()> {
        info!(?kind, ?priority, "demo: starting parity scan");
        let mut state = self.state.lock().unwrap();
        state.parity_active = true;
        state.parity_kind = Some(kind);
        state.parity_progress = 0;
        Ok(())
    }

    async fn parity_status(&self) -> anyhow::Result<ParityStatus> {
        let mut state = self.state.lock().unwrap();
        if state.parity_active {
            state.parity_progress = (state.parity_progress + 20).min(100);
            if state.parity_progress >= 100 {
                state.parity_active = false;
            }
        }
        Ok(ParityStatus {
            active: state.parity_active,
            kind: state.parity_kind,
            progress: Some(state.parity_progress),
            speed: Some("120 MB/s".to_string()),
            time_remaining: None,
            errors: Some(0),
        })
    }

    async fn cancel_parity(&self) -> anyhow::Result<()> {
        info!("demo: cancelling parity scan");
        let mut state = self.state.lock().unwrap();
        state.parity_active = false;
        Ok(())
    }

    async fn is_parity_running(&self) -> anyhow::Result<bool> {
        Ok(self.state.lock().unwrap().parity_active)
    }

    async fn array_state(&self) -> anyhow::Result<ArrayState> {
        Ok(self.state.lock().unwrap().array_state)
    }

    async fn driver_start(&self, maintenance: bool, check_filesystem: bool) -> anyhow::Result<()> {
        info!(maintenance, check_filesystem, "demo: starting multi-device driver");
        self.state.lock().unwrap().array_state = ArrayState::Started;
        Ok(())
    }

    async fn driver_stop(&self, force: bool) -> anyhow::Result<()> {
        info!(force, "demo: stopping multi-device driver");
        self.state.lock().unwrap().array_state = ArrayState::Stopped;
        Ok(())
    }

    async fn list_array_mounts(&self) -> anyhow::Result<Vec<String>> {
        if self.state.lock().unwrap().array_state == ArrayState::Started {
            Ok(vec!["/mnt/disk1".to_string(), "/mnt/disk2".to_string(), "/mnt/cache".to_string()])
        } else {
            Ok(vec![])
        }
    }

    async fn user_share_mounts(&self) -> anyhow::Result<Vec<String>> {
        if self.state.lock().unwrap().array_state == ArrayState::Started {
            Ok(vec!["/mnt/user".to_string()])
        } else {
            Ok(vec![])
        }
    }

    async fn unmount(&self, mountpoint: &str, mode: UnmountMode) -> anyhow::Result<()> {
        // Real unmounts sometimes need a retry while a process still holds
        // the mount open; this one never fails but exercises the same path.
        execute_with_retry(&RetryConfig::new().with_max_retries(2), || async {
            info!(mountpoint, ?mode, "demo: unmounting");
            Ok(())
        })
        .await
    }

    async fn disk_config(&self) -> anyhow::Result<Vec<DeviceAssignment>> {
        Ok(vec![
            DeviceAssignment { device: "/dev/sda".to_string(), slot: "disk1".to_string() },
            DeviceAssignment { device: "/dev/sdb".to_string(), slot: "disk2".to_string() },
        ])
    }

    async fn list_disks(&self) -> anyhow::Result<Vec<DiskInfo>> {
        Ok(vec![
            DiskInfo { id: "disk1".to_string(), device: "/dev/sda".to_string() },
            DiskInfo { id: "disk2".to_string(), device: "/dev/sdb".to_string() },
        ])
    }

    async fn smart_report(&self, disk_id: &str) -> anyhow::Result<SmartReport> {
        Ok(SmartReport {
            disk_id: disk_id.to_string(),
            healthy: true,
            temperature_celsius: Some(34),
            raw: "SMART overall-health self-assessment test result: PASSED".to_string(),
        })
    }
}

/// An in-process stand-in for the container runtime. Every id "exists" and
/// every action succeeds, logged for visibility.
#[derive(Default)]
pub struct DemoContainerManager {
    running: Mutex<Vec<String>>,
}

impl DemoContainerManager {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }
}

#[async_trait]
impl ContainerManager for DemoContainerManager {
    async fn list_running(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.running.lock().unwrap().clone())
    }

    async fn start(&self, id: &str) -> anyhow::Result<()> {
        info!(id, "demo: starting container");
        self.running.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn stop(&self, id: &str, _timeout: Duration) -> anyhow::Result<()> {
        info!(id, "demo: stopping container");
        self.running.lock().unwrap().retain(|c| c != id);
        Ok(())
    }

    async fn restart(&self, id: &str, _timeout: Duration) -> anyhow::Result<()> {
        info!(id, "demo: restarting container");
        Ok(())
    }
}

/// An in-process stand-in for the VM hypervisor.
#[derive(Default)]
pub struct DemoVmManager {
    running: Mutex<Vec<String>>,
}

impl DemoVmManager {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }
}

#[async_trait]
impl VMManager for DemoVmManager {
    async fn list_running(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.running.lock().unwrap().clone())
    }

    async fn shutdown(&self, name: &str) -> anyhow::Result<()> {
        info!(name, "demo: shutting down domain");
        self.running.lock().unwrap().retain(|v| v != name);
        Ok(())
    }
}

/// An in-process stand-in for whole-system power actions. Never actually
/// reboots or shuts down the host the agent runs on.
#[derive(Default)]
pub struct DemoSystemController;

impl DemoSystemController {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self)
    }
}

#[async_trait]
impl SystemController for DemoSystemController {
    async fn reboot(&self) -> anyhow::Result<()> {
        warn!("demo: system reboot requested (no-op in this binary)");
        Ok(())
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        warn!("demo: system shutdown requested (no-op in this binary)");
        Ok(())
    }
}

/// An in-process metrics source feeding the stream fan-out demo: a handful
/// of synthetic gauges that change shape each time they're read.
#[derive(Default)]
pub struct DemoMetricsCollector {
    calls: Mutex<HashMap<String, u64>>,
}

impl DemoMetricsCollector {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }
}

#[async_trait]
impl MetricsCollector for DemoMetricsCollector {
    async fn get(&self, metric_name: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(metric_name.to_string()).or_insert(0);
        *count += 1;

        let value = match metric_name {
            "array.state" => serde_json::json!({"reads": *count}),
            "cpu.load" => serde_json::json!({"percent": (*count * 7) % 100}),
            "memory.used_bytes" => serde_json::json!({"bytes": 1_000_000_000u64 + *count * 4096}),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}
