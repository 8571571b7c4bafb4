//! In-memory stub collaborators for exercising executors and the array
//! orchestrator without a real storage driver, container runtime, or
//! hypervisor.

use crate::collaborators::{
    ArrayState, Collaborators, ContainerManager, DeviceAssignment, DiskInfo, MetricsCollector,
    ParityKind, ParityStatus, SmartReport, StorageDriver, SystemController, UnmountMode, VMManager,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Controls how many times a stubbed fallible call fails before it starts
/// (or continues to) succeed.
#[derive(Debug, Clone, Copy)]
pub enum FailAfter {
    Never,
    Always,
    Times(u32),
}

impl FailAfter {
    fn should_fail(&self, attempt: u32) -> bool {
        match self {
            FailAfter::Never => false,
            FailAfter::Always => true,
            FailAfter::Times(n) => attempt < *n,
        }
    }
}

struct StorageState {
    parity_active: bool,
    parity_kind: Option<ParityKind>,
    parity_sequence: VecDeque<ParityStatus>,
    cancel_parity_calls: u32,
    array_state: ArrayState,
    array_state_calls: u32,
    auto_start_after: Option<u32>,
    auto_stop_after: Option<u32>,
    disk_config: Vec<DeviceAssignment>,
    disks: Vec<DiskInfo>,
    smart_reports: HashMap<String, SmartReport>,
    array_mounts: Vec<String>,
    user_share_mounts: Vec<String>,
    unmount_calls: Vec<(String, UnmountMode)>,
    unmount_fail: FailAfter,
    unmount_attempts: u32,
}

impl Default for StorageState {
    fn default() -> Self {
        Self {
            parity_active: false,
            parity_kind: None,
            parity_sequence: VecDeque::new(),
            cancel_parity_calls: 0,
            array_state: ArrayState::Stopped,
            array_state_calls: 0,
            auto_start_after: None,
            auto_stop_after: None,
            disk_config: vec![DeviceAssignment {
                device: "/dev/sda".to_string(),
                slot: "disk1".to_string(),
            }],
            disks: vec![],
            smart_reports: HashMap::new(),
            array_mounts: vec!["/mnt/disk1".to_string()],
            user_share_mounts: vec![],
            unmount_calls: vec![],
            unmount_fail: FailAfter::Never,
            unmount_attempts: 0,
        }
    }
}

/// An in-memory [`StorageDriver`] whose behavior tests configure directly.
pub struct StubStorageDriver {
    state: Mutex<StorageState>,
}

impl Default for StubStorageDriver {
    fn default() -> Self {
        Self {
            state: Mutex::new(StorageState::default()),
        }
    }
}

impl StubStorageDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_disk_config(&self, config: Vec<DeviceAssignment>) {
        self.state.lock().unwrap().disk_config = config;
    }

    pub fn set_array_state(&self, state: ArrayState) {
        self.state.lock().unwrap().array_state = state;
    }

    /// After this many calls to `array_state()`, the reported state flips to
    /// `Started` (simulating the driver asynchronously finishing its start).
    pub fn set_auto_start_after(&self, calls: u32) {
        self.state.lock().unwrap().auto_start_after = Some(calls);
    }

    /// Symmetric to [`Self::set_auto_start_after`], for stop.
    pub fn set_auto_stop_after(&self, calls: u32) {
        self.state.lock().unwrap().auto_stop_after = Some(calls);
    }

    pub fn set_user_share_mounts(&self, mounts: Vec<String>) {
        self.state.lock().unwrap().user_share_mounts = mounts;
    }

    pub fn set_array_mounts(&self, mounts: Vec<String>) {
        self.state.lock().unwrap().array_mounts = mounts;
    }

    pub fn set_parity_sequence(&self, sequence: Vec<ParityStatus>) {
        self.state.lock().unwrap().parity_sequence = sequence.into();
    }

    pub fn fail_unmount(&self, mode: FailAfter) {
        self.state.lock().unwrap().unmount_fail = mode;
    }

    pub fn set_disks(&self, disks: Vec<DiskInfo>) {
        self.state.lock().unwrap().disks = disks;
    }

    pub fn set_smart_report(&self, disk_id: impl Into<String>, report: SmartReport) {
        self.state.lock().unwrap().smart_reports.insert(disk_id.into(), report);
    }

    pub fn cancel_parity_calls(&self) -> u32 {
        self.state.lock().unwrap().cancel_parity_calls
    }

    pub fn unmount_calls(&self) -> Vec<(String, UnmountMode)> {
        self.state.lock().unwrap().unmount_calls.clone()
    }
}

#[async_trait]
impl StorageDriver for StubStorageDriver {
    async fn start_parity(&self, kind: ParityKind, _priority: crate::collaborators::ParityPriority) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.parity_active = true;
        state.parity_kind = Some(kind);
        Ok(())
    }

    async fn parity_status(&self) -> anyhow::Result<ParityStatus> {
        let mut state = self.state.lock().unwrap();
        if let Some(next) = state.parity_sequence.pop_front() {
            state.parity_active = next.active;
            return Ok(next);
        }
        Ok(ParityStatus {
            active: state.parity_active,
            kind: state.parity_kind,
            progress: None,
            speed: None,
            time_remaining: None,
            errors: None,
        })
    }

    async fn cancel_parity(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.cancel_parity_calls += 1;
        state.parity_active = false;
        Ok(())
    }

    async fn is_parity_running(&self) -> anyhow::Result<bool> {
        Ok(self.state.lock().unwrap().parity_active)
    }

    async fn array_state(&self) -> anyhow::Result<ArrayState> {
        let mut state = self.state.lock().unwrap();
        state.array_state_calls += 1;
        if let Some(after) = state.auto_start_after
            && state.array_state_calls >= after
            && state.array_state == ArrayState::Stopped
        {
            state.array_state = ArrayState::Started;
        }
        if let Some(after) = state.auto_stop_after
            && state.array_state_calls >= after
            && state.array_state == ArrayState::Started
        {
            state.array_state = ArrayState::Stopped;
        }
        Ok(state.array_state)
    }

    async fn driver_start(&self, _maintenance: bool, _check_filesystem: bool) -> anyhow::Result<()> {
        Ok(())
    }

    async fn driver_stop(&self, _force: bool) -> anyhow::Result<()> {
        Ok(())
    }

    async fn list_array_mounts(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.state.lock().unwrap().array_mounts.clone())
    }

    async fn user_share_mounts(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.state.lock().unwrap().user_share_mounts.clone())
    }

    async fn unmount(&self, mountpoint: &str, mode: UnmountMode) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.unmount_calls.push((mountpoint.to_string(), mode));
        let attempt = state.unmount_attempts;
        state.unmount_attempts += 1;
        if state.unmount_fail.should_fail(attempt) {
            anyhow::bail!("unmount failed for {mountpoint}");
        }
        Ok(())
    }

    async fn disk_config(&self) -> anyhow::Result<Vec<DeviceAssignment>> {
        Ok(self.state.lock().unwrap().disk_config.clone())
    }

    async fn list_disks(&self) -> anyhow::Result<Vec<DiskInfo>> {
        Ok(self.state.lock().unwrap().disks.clone())
    }

    async fn smart_report(&self, disk_id: &str) -> anyhow::Result<SmartReport> {
        self.state
            .lock()
            .unwrap()
            .smart_reports
            .get(disk_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no smart report for {disk_id}"))
    }
}

/// An in-memory [`ContainerManager`] with per-id failure injection.
#[derive(Default)]
pub struct StubContainerManager {
    running: Mutex<Vec<String>>,
    fail_ids: Mutex<Vec<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubContainerManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_running(&self, ids: Vec<String>) {
        *self.running.lock().unwrap() = ids;
    }

    pub fn fail_for(&self, id: impl Into<String>) {
        self.fail_ids.lock().unwrap().push(id.into());
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerManager for StubContainerManager {
    async fn list_running(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.running.lock().unwrap().clone())
    }

    async fn start(&self, id: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push((id.to_string(), "start".to_string()));
        if self.fail_ids.lock().unwrap().contains(&id.to_string()) {
            anyhow::bail!("failed to start {id}");
        }
        Ok(())
    }

    async fn stop(&self, id: &str, _timeout: Duration) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push((id.to_string(), "stop".to_string()));
        if self.fail_ids.lock().unwrap().contains(&id.to_string()) {
            anyhow::bail!("failed to stop {id}");
        }
        Ok(())
    }

    async fn restart(&self, id: &str, _timeout: Duration) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((id.to_string(), "restart".to_string()));
        if self.fail_ids.lock().unwrap().contains(&id.to_string()) {
            anyhow::bail!("failed to restart {id}");
        }
        Ok(())
    }
}

/// An in-memory [`VMManager`] with per-name failure injection.
#[derive(Default)]
pub struct StubVMManager {
    running: Mutex<Vec<String>>,
    fail_names: Mutex<Vec<String>>,
}

impl StubVMManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_running(&self, names: Vec<String>) {
        *self.running.lock().unwrap() = names;
    }

    pub fn fail_for(&self, name: impl Into<String>) {
        self.fail_names.lock().unwrap().push(name.into());
    }
}

#[async_trait]
impl VMManager for StubVMManager {
    async fn list_running(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.running.lock().unwrap().clone())
    }

    async fn shutdown(&self, name: &str) -> anyhow::Result<()> {
        if self.fail_names.lock().unwrap().contains(&name.to_string()) {
            anyhow::bail!("failed to shut down {name}");
        }
        Ok(())
    }
}

/// An in-memory [`SystemController`] that records whether reboot/shutdown
/// were invoked, rather than touching the real machine.
#[derive(Default)]
pub struct StubSystemController {
    rebooted: AtomicBool,
    shut_down: AtomicBool,
}

impl StubSystemController {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn was_rebooted(&self) -> bool {
        self.rebooted.load(Ordering::SeqCst)
    }

    pub fn was_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SystemController for StubSystemController {
    async fn reboot(&self) -> anyhow::Result<()> {
        self.rebooted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// An in-memory [`MetricsCollector`] backed by a simple map.
#[derive(Default)]
pub struct StubMetricsCollector {
    values: Mutex<HashMap<String, serde_json::Value>>,
    call_count: AtomicU32,
}

impl StubMetricsCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, metric: impl Into<String>, value: serde_json::Value) {
        self.values.lock().unwrap().insert(metric.into(), value);
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsCollector for StubMetricsCollector {
    async fn get(&self, metric_name: &str) -> anyhow::Result<Option<serde_json::Value>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.lock().unwrap().get(metric_name).cloned())
    }
}

/// A convenience bundle of every stub collaborator, wired into a
/// [`Collaborators`] set.
pub struct StubCollaborators {
    pub storage: Arc<StubStorageDriver>,
    pub containers: Arc<StubContainerManager>,
    pub vms: Arc<StubVMManager>,
    pub system: Arc<StubSystemController>,
    pub metrics: Arc<StubMetricsCollector>,
}

impl StubCollaborators {
    pub fn new() -> Self {
        Self {
            storage: StubStorageDriver::new(),
            containers: StubContainerManager::new(),
            vms: StubVMManager::new(),
            system: StubSystemController::new(),
            metrics: StubMetricsCollector::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            storage: self.storage.clone(),
            containers: self.containers.clone(),
            vms: self.vms.clone(),
            system: self.system.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl Default for StubCollaborators {
    fn default() -> Self {
        Self::new()
    }
}
