//! SMART Scan executor: fetch comprehensive SMART data for every detected
//! disk. Not long-running — a scan of the disk population completes well
//! within the time a caller is expected to poll once or twice.

use crate::callback_system::{CallbackSender, ProgressUpdate};
use crate::collaborators::StorageDriver;
use crate::error::{AgentError, Result};
use crate::operation::record::OperationRecord;
use crate::operation::registry::OperationExecutor;
use crate::operation::types::OperationType;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

pub struct SmartScanExecutor {
    storage: Arc<dyn StorageDriver>,
}

impl SmartScanExecutor {
    pub fn new(storage: Arc<dyn StorageDriver>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl OperationExecutor for SmartScanExecutor {
    fn operation_type(&self) -> OperationType {
        OperationType::SmartScan
    }

    async fn execute(
        &self,
        record: &OperationRecord,
        _params: &HashMap<String, Value>,
        callback: Arc<dyn CallbackSender>,
    ) -> Result<Option<Value>> {
        let started = Instant::now();
        let disks = self.storage.list_disks().await.map_err(AgentError::External)?;
        if disks.is_empty() {
            return Ok(Some(serde_json::json!({"disks_scanned": 0, "scan_duration_ms": 0})));
        }

        let total = disks.len();
        let mut reports = Vec::with_capacity(total);

        for (i, disk) in disks.into_iter().enumerate() {
            if record.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let report = self
                .storage
                .smart_report(&disk.id)
                .await
                .map_err(AgentError::External)?;

            let _ = callback
                .send_progress(ProgressUpdate::Output {
                    operation_id: record.id().to_string(),
                    line: format!("{}: healthy={}", disk.id, report.healthy),
                    is_error: !report.healthy,
                })
                .await;

            reports.push(report);
            record.update_progress((((i + 1) as f64 / total as f64) * 100.0) as u8);
        }

        Ok(Some(serde_json::json!({
            "disks_scanned": total,
            "scan_duration_ms": started.elapsed().as_millis() as u64,
            "reports": reports,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback_system::NoOpCallbackSender;
    use crate::collaborators::{DiskInfo, SmartReport};
    use crate::test_utils::StubCollaborators;

    fn new_record() -> OperationRecord {
        OperationRecord::new("op-1".to_string(), OperationType::SmartScan, "smart scan".to_string(), true, None)
    }

    #[tokio::test]
    async fn scans_every_disk_and_reports_full_progress() {
        let stub = StubCollaborators::new();
        stub.storage.set_disks(vec![
            DiskInfo { id: "disk1".to_string(), device: "/dev/sda".to_string() },
            DiskInfo { id: "disk2".to_string(), device: "/dev/sdb".to_string() },
        ]);
        stub.storage.set_smart_report(
            "disk1",
            SmartReport { disk_id: "disk1".to_string(), healthy: true, temperature_celsius: Some(35), raw: String::new() },
        );
        stub.storage.set_smart_report(
            "disk2",
            SmartReport { disk_id: "disk2".to_string(), healthy: false, temperature_celsius: Some(55), raw: String::new() },
        );

        let executor = SmartScanExecutor::new(stub.storage.clone());
        let record = new_record();
        let result = executor
            .execute(&record, &HashMap::new(), Arc::new(NoOpCallbackSender))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result["disks_scanned"], 2);
        assert_eq!(record.snapshot().progress, 100);
    }

    #[tokio::test]
    async fn no_disks_completes_trivially() {
        let stub = StubCollaborators::new();
        let executor = SmartScanExecutor::new(stub.storage.clone());
        let record = new_record();
        let result = executor
            .execute(&record, &HashMap::new(), Arc::new(NoOpCallbackSender))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result["disks_scanned"], 0);
    }
}
