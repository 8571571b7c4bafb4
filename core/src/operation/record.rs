//! The thread-safe operation record: the unit of lifecycle state the
//! manager hands out on admission and that executors mutate as they run.

use crate::utils::time;
use arrayd_common::state_machine::StateMachine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::types::{OperationStatus, OperationType};

/// The mutable fields of an operation record, guarded by a single mutex.
/// The manager's map lock only ever protects *which records exist*; a
/// record's own state transitions serialize here, independent of the map.
#[derive(Debug, Clone)]
struct Inner {
    status: OperationStatus,
    progress: u8,
    result: Option<Value>,
    error: Option<String>,
    started: SystemTime,
    completed: Option<SystemTime>,
}

/// An immutable, serializable view of an operation, safe to hand to external
/// callers. Never exposes the cancellation token or completion notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSnapshot {
    pub id: String,
    pub operation_type: OperationType,
    pub description: String,
    pub status: OperationStatus,
    pub progress: u8,
    pub result: Option<Value>,
    pub error: Option<String>,
    #[serde(with = "time")]
    pub started: SystemTime,
    #[serde(with = "time::option", default)]
    pub completed: Option<SystemTime>,
    pub cancellable: bool,
    pub created_by: Option<String>,
}

/// A single operation's lifecycle record.
///
/// Cloning an `OperationRecord` clones the `Arc` handles, so every clone
/// observes the same underlying state; this is how the manager, the
/// executor, and the stream fan-out all share one record.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    id: String,
    operation_type: OperationType,
    description: String,
    cancellable: bool,
    created_by: Option<String>,
    inner: Arc<StateMachine<Inner>>,
    cancellation_token: CancellationToken,
    completion_notifier: Arc<Notify>,
}

impl OperationRecord {
    pub fn new(
        id: String,
        operation_type: OperationType,
        description: String,
        cancellable: bool,
        created_by: Option<String>,
    ) -> Self {
        Self {
            id,
            operation_type,
            description,
            cancellable,
            created_by,
            inner: Arc::new(StateMachine::new(Inner {
                status: OperationStatus::Pending,
                progress: 0,
                result: None,
                error: None,
                started: SystemTime::now(),
                completed: None,
            })),
            cancellation_token: CancellationToken::new(),
            completion_notifier: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn cancellable(&self) -> bool {
        self.cancellable
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn status(&self) -> OperationStatus {
        self.inner.lock().status
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Transition from `pending` to `running`. No-op if already running or terminal.
    pub fn set_running(&self) {
        self.inner.transition(|s| {
            if s.status == OperationStatus::Pending {
                s.status = OperationStatus::Running;
            }
        });
    }

    /// Clamp `percent` to `[0, 100]` and assign it, unless the record is
    /// already terminal (a race the caller may hit right as cancellation
    /// lands; silently ignored, matching the "no-op on terminal" contract).
    pub fn update_progress(&self, percent: u8) {
        self.inner.transition(|s| {
            if !s.status.is_terminal() {
                s.progress = percent.min(100);
            }
        });
    }

    /// Mark the record completed. Returns `false` if it was already terminal.
    pub fn set_completed(&self, result: Option<Value>) -> bool {
        let changed = self.inner.transition(|s| {
            if s.status.is_terminal() {
                return false;
            }
            s.status = OperationStatus::Completed;
            s.progress = 100;
            s.result = result;
            s.completed = Some(SystemTime::now());
            true
        });
        if changed {
            self.completion_notifier.notify_waiters();
        }
        changed
    }

    /// Mark the record failed. Returns `false` if it was already terminal.
    pub fn set_failed(&self, error: impl Into<String>) -> bool {
        let changed = self.inner.transition(|s| {
            if s.status.is_terminal() {
                return false;
            }
            s.status = OperationStatus::Failed;
            s.error = Some(error.into());
            s.completed = Some(SystemTime::now());
            true
        });
        if changed {
            self.completion_notifier.notify_waiters();
        }
        changed
    }

    /// Mark the record cancelled, independent of whether the underlying
    /// work has actually stopped yet. Returns `false` if already terminal.
    fn set_cancelled(&self) -> bool {
        let changed = self.inner.transition(|s| {
            if s.status.is_terminal() {
                return false;
            }
            s.status = OperationStatus::Cancelled;
            s.completed = Some(SystemTime::now());
            true
        });
        if changed {
            self.completion_notifier.notify_waiters();
        }
        changed
    }

    /// Attempt to cancel this record. Returns `false` if the record is not
    /// cancellable or is already terminal; the caller is responsible for
    /// distinguishing those two cases if it needs to (the manager does, to
    /// return `not_cancellable` vs `already_terminal`).
    pub fn cancel(&self) -> bool {
        if !self.cancellable {
            return false;
        }
        if !self.set_cancelled() {
            return false;
        }
        self.cancellation_token.cancel();
        true
    }

    /// Wait until this record reaches a terminal state, or `timeout` elapses.
    pub async fn await_terminal(&self, timeout: Duration) -> Option<OperationSnapshot> {
        if self.is_terminal() {
            return Some(self.snapshot());
        }
        let notified = self.completion_notifier.notified();
        match tokio::time::timeout(timeout, notified).await {
            Ok(()) => Some(self.snapshot()),
            Err(_) => {
                if self.is_terminal() {
                    Some(self.snapshot())
                } else {
                    None
                }
            }
        }
    }

    pub fn snapshot(&self) -> OperationSnapshot {
        let inner = self.inner.lock();
        OperationSnapshot {
            id: self.id.clone(),
            operation_type: self.operation_type,
            description: self.description.clone(),
            status: inner.status,
            progress: inner.progress,
            result: inner.result.clone(),
            error: inner.error.clone(),
            started: inner.started,
            completed: inner.completed,
            cancellable: self.cancellable,
            created_by: self.created_by.clone(),
        }
    }
}
