//! The array lifecycle orchestrator: the multi-step state machine behind
//! the Array Start and Array Stop executors.
//!
//! Every step reports `(step_index, total_steps)` progress through the
//! caller-provided [`OperationRecord`] and checks the record's cancellation
//! token between sub-actions.

use crate::collaborators::{ArrayState, Collaborators, ParityKind, ParityPriority, UnmountMode};
use crate::error::{AgentError, Result};
use crate::operation::record::OperationRecord;
use serde_json::json;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Parameters for [`start`].
#[derive(Debug, Clone, Default)]
pub struct StartParams {
    pub maintenance_mode: bool,
    pub check_filesystem: bool,
}

/// Parameters for [`stop`].
#[derive(Debug, Clone)]
pub struct StopParams {
    pub force: bool,
    pub unmount_shares: bool,
    pub stop_containers: bool,
    pub stop_vms: bool,
}

impl Default for StopParams {
    fn default() -> Self {
        Self {
            force: false,
            unmount_shares: true,
            stop_containers: true,
            stop_vms: true,
        }
    }
}

fn report(record: &OperationRecord, step: u32, total: u32, _message: &str) {
    let percent = ((step as f64 / total as f64) * 100.0).round() as u8;
    record.update_progress(percent);
}

async fn check_cancelled(record: &OperationRecord) -> Result<()> {
    if record.is_cancelled() {
        return Err(AgentError::Cancelled);
    }
    Ok(())
}

/// Poll a predicate until it's satisfied or `timeout` elapses, checking
/// cancellation every `poll_interval`.
async fn wait_for<F, Fut>(
    record: &OperationRecord,
    timeout: Duration,
    poll_interval: Duration,
    what: &str,
    mut predicate: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<bool>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        check_cancelled(record).await?;
        if predicate().await.map_err(AgentError::External)? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(AgentError::Timeout(what.to_string()));
        }
        sleep(poll_interval).await;
    }
}

/// Start the array: validate configuration, check for in-progress parity,
/// start the driver, wait for `started`, verify mounts.
pub async fn start(
    record: &OperationRecord,
    collaborators: &Collaborators,
    params: StartParams,
    state_poll_interval: Duration,
    start_timeout: Duration,
) -> Result<serde_json::Value> {
    const TOTAL: u32 = 5;

    report(record, 1, TOTAL, "validating disk configuration");
    check_cancelled(record).await?;
    let config = collaborators
        .storage
        .disk_config()
        .await
        .map_err(AgentError::External)?;
    if config.is_empty() {
        return Err(AgentError::Validation(
            "no disk configuration assigned".to_string(),
        ));
    }

    report(record, 2, TOTAL, "checking parity activity");
    check_cancelled(record).await?;
    if collaborators
        .storage
        .is_parity_running()
        .await
        .map_err(AgentError::External)?
    {
        return Err(AgentError::Validation("parity operation in progress".to_string()));
    }

    report(record, 3, TOTAL, "starting driver");
    check_cancelled(record).await?;
    collaborators
        .storage
        .driver_start(params.maintenance_mode, params.check_filesystem)
        .await
        .map_err(AgentError::External)?;

    report(record, 4, TOTAL, "waiting for array to start");
    wait_for(
        record,
        start_timeout,
        state_poll_interval,
        "array start",
        || async {
            Ok(matches!(
                collaborators.storage.array_state().await?,
                ArrayState::Started
            ))
        },
    )
    .await?;

    report(record, 5, TOTAL, "verifying mounts");
    check_cancelled(record).await?;
    let array_mounts = collaborators
        .storage
        .list_array_mounts()
        .await
        .map_err(AgentError::External)?;
    let cache_mounts_present = !array_mounts.is_empty();
    if !cache_mounts_present {
        tracing::warn!("array started but no array/cache mounts were found");
    }

    Ok(json!({"state": "started", "mounts": array_mounts}))
}

/// Stop the array: quiesce containers and VMs, handle an active parity
/// operation, unmount shares, unmount disks, stop the driver, wait for
/// `stopped`.
pub async fn stop(
    record: &OperationRecord,
    collaborators: &Collaborators,
    params: StopParams,
    state_poll_interval: Duration,
    stop_timeout: Duration,
    container_timeout: Duration,
    vm_timeout: Duration,
) -> Result<serde_json::Value> {
    const TOTAL: u32 = 7;
    let mut container_failures = Vec::new();
    let mut vm_failures = Vec::new();

    report(record, 1, TOTAL, "stopping containers");
    if params.stop_containers {
        check_cancelled(record).await?;
        let running = collaborators
            .containers
            .list_running()
            .await
            .map_err(AgentError::External)?;
        for id in running {
            check_cancelled(record).await?;
            if let Err(err) = collaborators.containers.stop(&id, container_timeout).await {
                if !params.force {
                    return Err(AgentError::External(err));
                }
                container_failures.push(format!("{id}: {err}"));
            }
        }
    }

    report(record, 2, TOTAL, "stopping virtual machines");
    if params.stop_vms {
        check_cancelled(record).await?;
        let running = collaborators.vms.list_running().await.map_err(AgentError::External)?;
        let deadline = Instant::now() + vm_timeout;
        for name in running {
            check_cancelled(record).await?;
            if let Err(err) = collaborators.vms.shutdown(&name).await {
                vm_failures.push(format!("{name}: {err}"));
            }
            if Instant::now() >= deadline {
                break;
            }
        }
        // No hard power-off primitive exists on VMManager; domains that
        // failed to quiesce are recorded and the `force` flag below governs
        // whether the overall stop proceeds anyway.
        if !vm_failures.is_empty() && !params.force {
            return Err(AgentError::Validation(format!(
                "vms failed to quiesce: {}",
                vm_failures.join(", ")
            )));
        }
    }

    report(record, 3, TOTAL, "handling parity");
    check_cancelled(record).await?;
    if collaborators
        .storage
        .is_parity_running()
        .await
        .map_err(AgentError::External)?
    {
        collaborators
            .storage
            .cancel_parity()
            .await
            .map_err(AgentError::External)?;
        if !params.force {
            sleep(Duration::from_secs(5)).await;
        }
    }

    report(record, 4, TOTAL, "unmounting user shares");
    if params.unmount_shares {
        check_cancelled(record).await?;
        let shares = collaborators
            .storage
            .user_share_mounts()
            .await
            .map_err(AgentError::External)?;
        for mount in shares {
            check_cancelled(record).await?;
            if let Err(err) = collaborators.storage.unmount(&mount, UnmountMode::Lazy).await
                && !params.force
            {
                return Err(AgentError::External(err));
            }
        }
    }

    report(record, 5, TOTAL, "unmounting array disks");
    check_cancelled(record).await?;
    let mut mounts = collaborators
        .storage
        .list_array_mounts()
        .await
        .map_err(AgentError::External)?;
    mounts.sort_by(|a, b| b.cmp(a));
    for mount in mounts {
        check_cancelled(record).await?;
        if let Err(lazy_err) = collaborators.storage.unmount(&mount, UnmountMode::Lazy).await
            && let Err(force_err) = collaborators.storage.unmount(&mount, UnmountMode::Force).await
        {
            if !params.force {
                return Err(AgentError::External(force_err));
            }
            tracing::warn!(mount, error = %lazy_err, "failed to unmount array disk even with force");
        }
    }

    report(record, 6, TOTAL, "stopping driver");
    check_cancelled(record).await?;
    collaborators
        .storage
        .driver_stop(params.force)
        .await
        .map_err(AgentError::External)?;

    report(record, 7, TOTAL, "waiting for array to stop");
    wait_for(
        record,
        stop_timeout,
        state_poll_interval,
        "array stop",
        || async {
            Ok(matches!(
                collaborators.storage.array_state().await?,
                ArrayState::Stopped
            ))
        },
    )
    .await?;

    Ok(json!({
        "state": "stopped",
        "container_failures": container_failures,
        "vm_failures": vm_failures,
    }))
}

pub fn parity_kind_from_params(params: &std::collections::HashMap<String, serde_json::Value>) -> ParityKind {
    match params.get("type").and_then(|v| v.as_str()) {
        Some("correct") => ParityKind::Correct,
        _ => ParityKind::Check,
    }
}

pub fn parity_priority_from_params(
    params: &std::collections::HashMap<String, serde_json::Value>,
) -> ParityPriority {
    match params.get("priority").and_then(|v| v.as_str()) {
        Some("low") => ParityPriority::Low,
        Some("high") => ParityPriority::High,
        _ => ParityPriority::Normal,
    }
}
