//! The operation manager: admission control, conflict detection, worker
//! dispatch, and retention for operation records.
//!
//! A single map-guarding `RwLock`, a background sweep task reached through a
//! `Weak` handle so it never keeps the manager alive past its last strong
//! reference, and a completion-notification path that tolerates the
//! operation finishing before a caller starts waiting on it.

use crate::callback_system::{CallbackSender, NoOpCallbackSender, ProgressUpdate};
use crate::config::ManagerConfig;
use crate::error::{AgentError, Result};
use crate::operation::record::{OperationRecord, OperationSnapshot};
use crate::operation::registry::ExecutorRegistry;
use crate::operation::types::{OperationRequest, OperationStatus, OperationType};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Aggregate counters over the current set of operation records.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct OperationStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub max_active_operations: usize,
    pub by_status: HashMap<OperationStatus, usize>,
    pub by_type: HashMap<OperationType, usize>,
}

/// Optional filters for [`OperationManager::list_operations`].
#[derive(Debug, Clone, Default)]
pub struct OperationFilter {
    pub status: Option<OperationStatus>,
    pub operation_type: Option<OperationType>,
}

pub struct OperationManager {
    records: RwLock<HashMap<String, OperationRecord>>,
    registry: Arc<ExecutorRegistry>,
    config: ManagerConfig,
    workers: Mutex<HashMap<String, JoinHandle<()>>>,
    next_id: std::sync::atomic::AtomicU64,
    shutting_down: std::sync::atomic::AtomicBool,
}

impl OperationManager {
    pub fn new(config: ManagerConfig, registry: Arc<ExecutorRegistry>) -> Arc<Self> {
        let manager = Arc::new(Self {
            records: RwLock::new(HashMap::new()),
            registry,
            config,
            workers: Mutex::new(HashMap::new()),
            next_id: std::sync::atomic::AtomicU64::new(1),
            shutting_down: std::sync::atomic::AtomicBool::new(false),
        });
        Self::start_retention_sweep(Arc::downgrade(&manager));
        manager
    }

    fn allocate_id(&self) -> String {
        let n = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("op-{n:08x}")
    }

    /// Admit a new operation. Returns immediately after allocating the
    /// record and spawning its worker — never blocks on the work itself.
    pub async fn start_operation(
        self: &Arc<Self>,
        request: OperationRequest,
    ) -> Result<OperationSnapshot> {
        if self.shutting_down.load(std::sync::atomic::Ordering::Acquire) {
            return Err(AgentError::Validation(
                "manager is shutting down, no new operations accepted".to_string(),
            ));
        }

        let executor = self
            .registry
            .get(request.operation_type)
            .await
            .ok_or_else(|| AgentError::NoExecutor(request.operation_type.to_string()))?;

        let mut records = self.records.write().await;

        if let Some(conflict) = records
            .values()
            .find(|r| !r.is_terminal() && r.operation_type().conflicts_with(request.operation_type))
        {
            return Err(AgentError::ConflictingOperation {
                id: conflict.id().to_string(),
                operation_type: conflict.operation_type().to_string(),
            });
        }

        let active = records.values().filter(|r| !r.is_terminal()).count();
        if active >= self.config.max_active_operations {
            return Err(AgentError::Capacity {
                active,
                max: self.config.max_active_operations,
            });
        }

        let id = self.allocate_id();
        let description = request
            .description
            .clone()
            .unwrap_or_else(|| request.operation_type.to_string());
        let record = OperationRecord::new(
            id.clone(),
            request.operation_type,
            description.clone(),
            request.cancellable,
            request.caller.clone(),
        );
        records.insert(id.clone(), record.clone());
        let snapshot = record.snapshot();
        drop(records);

        let manager = Arc::clone(self);
        let params = request.params.clone();
        let handle = tokio::spawn(async move {
            manager.run_worker(record, executor, params).await;
        });
        self.workers.lock().await.insert(id, handle);

        Ok(snapshot)
    }

    async fn run_worker(
        self: Arc<Self>,
        record: OperationRecord,
        executor: Arc<dyn crate::operation::registry::OperationExecutor>,
        params: HashMap<String, serde_json::Value>,
    ) {
        record.set_running();
        let callback: Arc<dyn CallbackSender> = Arc::new(NoOpCallbackSender);
        let _ = callback
            .send_progress(ProgressUpdate::Started {
                operation_id: record.id().to_string(),
                operation_type: record.operation_type().to_string(),
                description: record.id().to_string(),
            })
            .await;

        if record.is_cancelled() {
            return;
        }

        let result = executor.execute(&record, &params, callback).await;

        if record.is_cancelled() {
            // The cancellation already marked the record terminal; the
            // executor's return value (success, error, or a dangling
            // cancellation) is moot at this point.
            return;
        }

        match result {
            Ok(value) => {
                record.set_completed(value);
            }
            Err(AgentError::Cancelled) => {
                // Executor observed cancellation faster than our check above;
                // the record's own `cancel()` call is what flips it terminal,
                // so there's nothing left to do if it raced ahead of us.
            }
            Err(err) => {
                record.set_failed(err.to_string());
            }
        }

        self.workers.lock().await.remove(record.id());
    }

    pub async fn get_operation(&self, id: &str) -> Result<OperationSnapshot> {
        let records = self.records.read().await;
        records
            .get(id)
            .map(|r| r.snapshot())
            .ok_or_else(|| AgentError::NotFound(id.to_string()))
    }

    pub async fn list_operations(&self, filter: OperationFilter) -> Vec<OperationSnapshot> {
        let records = self.records.read().await;
        records
            .values()
            .map(|r| r.snapshot())
            .filter(|s| filter.status.is_none_or(|st| st == s.status))
            .filter(|s| {
                filter
                    .operation_type
                    .is_none_or(|t| t == s.operation_type)
            })
            .collect()
    }

    pub async fn cancel_operation(&self, id: &str) -> Result<()> {
        let records = self.records.read().await;
        let record = records.get(id).ok_or_else(|| AgentError::NotFound(id.to_string()))?;

        if record.is_terminal() {
            return Err(AgentError::AlreadyTerminal);
        }
        if !record.cancellable() {
            return Err(AgentError::NotCancellable);
        }
        if record.cancel() {
            Ok(())
        } else {
            Err(AgentError::AlreadyTerminal)
        }
    }

    pub async fn await_operation(&self, id: &str, timeout: Duration) -> Result<OperationSnapshot> {
        let record = {
            let records = self.records.read().await;
            records
                .get(id)
                .cloned()
                .ok_or_else(|| AgentError::NotFound(id.to_string()))?
        };
        record
            .await_terminal(timeout)
            .await
            .ok_or_else(|| AgentError::Timeout(format!("operation {id}")))
    }

    pub async fn stats(&self) -> OperationStats {
        let records = self.records.read().await;
        let mut stats = OperationStats {
            max_active_operations: self.config.max_active_operations,
            ..Default::default()
        };
        for r in records.values() {
            stats.total += 1;
            match r.status() {
                OperationStatus::Pending | OperationStatus::Running => stats.active += 1,
                OperationStatus::Completed => stats.completed += 1,
                OperationStatus::Failed => stats.failed += 1,
                OperationStatus::Cancelled => stats.cancelled += 1,
            }
            *stats.by_status.entry(r.status()).or_insert(0) += 1;
            *stats.by_type.entry(r.operation_type()).or_insert(0) += 1;
        }
        stats
    }

    pub async fn register_executor(
        &self,
        executor: Arc<dyn crate::operation::registry::OperationExecutor>,
    ) {
        self.registry.register(executor).await;
    }

    /// Cancel every non-terminal operation, then wait up to the configured
    /// grace period for their workers to exit before aborting stragglers.
    /// After this returns, `start_operation` rejects all further admissions.
    pub async fn stop(&self) {
        self.shutting_down
            .store(true, std::sync::atomic::Ordering::Release);

        let ids: Vec<String> = {
            let records = self.records.read().await;
            records
                .values()
                .filter(|r| !r.is_terminal())
                .map(|r| r.id().to_string())
                .collect()
        };
        for id in &ids {
            let _ = self.cancel_operation(id).await;
        }

        let deadline = tokio::time::Instant::now() + self.config.shutdown_grace();
        loop {
            let remaining: Vec<String> = {
                let workers = self.workers.lock().await;
                workers.keys().cloned().collect()
            };
            if remaining.is_empty() || tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let mut workers = self.workers.lock().await;
        for (_id, handle) in workers.drain() {
            handle.abort();
        }
    }

    fn start_retention_sweep(manager: Weak<Self>) {
        tokio::spawn(async move {
            loop {
                let Some(manager) = manager.upgrade() else {
                    return;
                };
                let interval = manager.config.retention_sweep_interval();
                manager.sweep_retention().await;
                drop(manager);
                tokio::time::sleep(interval).await;
            }
        });
    }

    async fn sweep_retention(&self) {
        let retention = &self.config.retention;
        let now = SystemTime::now();
        let mut records = self.records.write().await;

        let mut terminal_ids: Vec<(String, SystemTime)> = records
            .values()
            .filter(|r| r.is_terminal())
            .filter_map(|r| {
                let snap = r.snapshot();
                snap.completed.map(|c| (snap.id, c))
            })
            .collect();
        terminal_ids.sort_by_key(|(_, completed)| *completed);

        let excess = terminal_ids.len().saturating_sub(retention.max_terminal_records);
        if excess == 0 {
            return;
        }

        let max_age = retention.max_terminal_age();
        for (id, completed) in terminal_ids.into_iter().take(excess) {
            let age = now.duration_since(completed).unwrap_or(Duration::ZERO);
            if age > max_age {
                records.remove(&id);
            }
        }
    }
}
