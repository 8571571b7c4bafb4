//! Operation type taxonomy, request shape, and the conflict table that
//! drives admission control.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The kind of work an operation performs. Each variant is bound to exactly
/// one [`crate::operation::registry::OperationExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    ParityCheck,
    ParityCorrect,
    ArrayStart,
    ArrayStop,
    DiskScan,
    SmartScan,
    SystemReboot,
    SystemShutdown,
    BulkContainer,
    BulkVm,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::ParityCheck => "parity_check",
            OperationType::ParityCorrect => "parity_correct",
            OperationType::ArrayStart => "array_start",
            OperationType::ArrayStop => "array_stop",
            OperationType::DiskScan => "disk_scan",
            OperationType::SmartScan => "smart_scan",
            OperationType::SystemReboot => "system_reboot",
            OperationType::SystemShutdown => "system_shutdown",
            OperationType::BulkContainer => "bulk_container",
            OperationType::BulkVm => "bulk_vm",
        }
    }

    /// The set of operation types that cannot coexist (while non-terminal)
    /// with an operation of this type.
    ///
    /// `system_reboot`/`system_shutdown` conflict with everything, including
    /// themselves; every other type's conflict set is symmetric but finite.
    pub fn conflicts(&self) -> &'static [OperationType] {
        use OperationType::*;
        match self {
            ParityCheck | ParityCorrect => {
                &[ParityCheck, ParityCorrect, ArrayStart, ArrayStop, DiskScan]
            }
            ArrayStart => &[ArrayStart, ArrayStop],
            ArrayStop => &[ArrayStart, ArrayStop, ParityCheck, ParityCorrect],
            DiskScan => &[ParityCheck, ParityCorrect, ArrayStart, ArrayStop],
            SystemReboot | SystemShutdown => ALL_TYPES,
            SmartScan | BulkContainer | BulkVm => &[],
        }
    }

    /// Whether `self` conflicts with `other`, accounting for the universal
    /// reboot/shutdown exclusion even when it isn't named on `other`'s side.
    pub fn conflicts_with(&self, other: OperationType) -> bool {
        matches!(self, OperationType::SystemReboot | OperationType::SystemShutdown)
            || matches!(other, OperationType::SystemReboot | OperationType::SystemShutdown)
            || self.conflicts().contains(&other)
            || other.conflicts().contains(self)
    }
}

const ALL_TYPES: &[OperationType] = &[
    OperationType::ParityCheck,
    OperationType::ParityCorrect,
    OperationType::ArrayStart,
    OperationType::ArrayStop,
    OperationType::DiskScan,
    OperationType::SmartScan,
    OperationType::SystemReboot,
    OperationType::SystemShutdown,
    OperationType::BulkContainer,
    OperationType::BulkVm,
];

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The lifecycle state of an operation record.
///
/// Valid transitions: `Pending -> Running -> {Completed|Failed|Cancelled}`,
/// `Pending -> Cancelled`, `Running -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Failed | OperationStatus::Cancelled
        )
    }
}

/// A request to start a new operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    pub operation_type: OperationType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    #[serde(default = "default_true")]
    pub cancellable: bool,
    #[serde(default)]
    pub caller: Option<String>,
}

fn default_true() -> bool {
    true
}

impl OperationRequest {
    pub fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            description: None,
            params: HashMap::new(),
            cancellable: true,
            caller: None,
        }
    }

    pub fn with_params(mut self, params: HashMap<String, serde_json::Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn non_cancellable(mut self) -> Self {
        self.cancellable = false;
        self
    }
}
