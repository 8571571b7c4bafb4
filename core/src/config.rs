//! # Manager Configuration
//!
//! Defines the configuration for the operation manager, array orchestrator,
//! and stream fan-out, loaded from a TOML file with sensible defaults for
//! every field so a bare-minimum (or empty) config file is valid.
//!
//! ## Loading
//!
//! [`ManagerConfig::load`] reads and parses a TOML file. Missing files are
//! not an error at the call site of [`load_or_default`](ManagerConfig::load_or_default) —
//! the caller falls back to [`ManagerConfig::default`] and logs a warning,
//! mirroring how the rest of this codebase treats optional configuration as
//! a cascade rather than a hard requirement.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for the agent core.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct ManagerConfig {
    /// Maximum number of non-terminal operations admitted at once.
    pub max_active_operations: usize,
    /// How often the operation manager sweeps terminal records for retention (seconds).
    pub retention_sweep_interval_secs: u64,
    /// Retention policy for terminal operation records.
    pub retention: RetentionConfig,
    /// Poll interval used by the parity executor while a check/correct is active (seconds).
    pub parity_poll_interval_secs: u64,
    /// Poll interval used by the array orchestrator while waiting for driver state (seconds).
    pub array_state_poll_interval_secs: u64,
    /// Timeout for array start to reach the `started` state (seconds).
    pub array_start_timeout_secs: u64,
    /// Timeout for array stop to reach the `stopped` state (seconds).
    pub array_stop_timeout_secs: u64,
    /// Per-container timeout for bulk container operations (seconds).
    pub bulk_container_timeout_secs: u64,
    /// Per-VM timeout for bulk VM operations (seconds).
    pub bulk_vm_timeout_secs: u64,
    /// Grace period the manager waits for workers to observe cancellation during shutdown (seconds).
    pub shutdown_grace_secs: u64,
    /// Interval between streaming fan-out ticks (seconds).
    pub stream_tick_interval_secs: u64,
    /// Default subscription interval applied when a client requests less than one second (seconds).
    pub stream_default_interval_secs: u64,
    /// Capacity of each client's outbound message queue.
    pub stream_client_queue_capacity: usize,
    /// Address the HTTP/WebSocket server binds to.
    pub bind_addr: String,
    /// Logging verbosity (passed to `tracing_subscriber::EnvFilter` as a default).
    pub log_level: String,
    /// Whether to log to a rolling file instead of stderr.
    pub log_to_file: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_active_operations: 100,
            retention_sweep_interval_secs: 60,
            retention: RetentionConfig::default(),
            parity_poll_interval_secs: 5,
            array_state_poll_interval_secs: 1,
            array_start_timeout_secs: 60,
            array_stop_timeout_secs: 120,
            bulk_container_timeout_secs: 10,
            bulk_vm_timeout_secs: 30,
            shutdown_grace_secs: 5,
            stream_tick_interval_secs: 1,
            stream_default_interval_secs: 5,
            stream_client_queue_capacity: 256,
            bind_addr: "127.0.0.1:8787".to_string(),
            log_level: "info".to_string(),
            log_to_file: true,
        }
    }
}

impl ManagerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults (with a warning)
    /// if the file does not exist.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "config file not found, using defaults"
            );
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to load config file, using defaults"
                );
                Self::default()
            }
        }
    }

    pub fn retention_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention_sweep_interval_secs)
    }

    pub fn parity_poll_interval(&self) -> Duration {
        Duration::from_secs(self.parity_poll_interval_secs)
    }

    pub fn array_state_poll_interval(&self) -> Duration {
        Duration::from_secs(self.array_state_poll_interval_secs)
    }

    pub fn array_start_timeout(&self) -> Duration {
        Duration::from_secs(self.array_start_timeout_secs)
    }

    pub fn array_stop_timeout(&self) -> Duration {
        Duration::from_secs(self.array_stop_timeout_secs)
    }

    pub fn bulk_container_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_container_timeout_secs)
    }

    pub fn bulk_vm_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_vm_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn stream_tick_interval(&self) -> Duration {
        Duration::from_secs(self.stream_tick_interval_secs)
    }

    pub fn stream_default_interval(&self) -> Duration {
        Duration::from_secs(self.stream_default_interval_secs)
    }
}

/// Retention policy for terminal (completed/failed/cancelled) operation records.
///
/// A record is swept only once it exceeds *both* bounds, so a burst of
/// activity does not prematurely evict a record a caller might still be
/// polling.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct RetentionConfig {
    pub max_terminal_records: usize,
    pub max_terminal_age_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_terminal_records: 1000,
            max_terminal_age_secs: 24 * 60 * 60,
        }
    }
}

impl RetentionConfig {
    pub fn max_terminal_age(&self) -> Duration {
        Duration::from_secs(self.max_terminal_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ManagerConfig::default();
        let text = toml::to_string(&config).expect("serialize");
        let parsed: ManagerConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.max_active_operations, config.max_active_operations);
        assert_eq!(parsed.bind_addr, config.bind_addr);
    }

    #[test]
    fn load_or_default_falls_back_for_missing_file() {
        let config = ManagerConfig::load_or_default(Path::new("/nonexistent/arrayd.toml"));
        assert_eq!(config.max_active_operations, 100);
    }

    #[test]
    fn retention_defaults_match_documented_floor() {
        let retention = RetentionConfig::default();
        assert_eq!(retention.max_terminal_records, 1000);
        assert_eq!(retention.max_terminal_age(), Duration::from_secs(86_400));
    }
}
