//! # Progress Callback System
//!
//! Operations report progress and completion through a [`CallbackSender`]
//! rather than by returning a value synchronously. This lets the operation
//! manager, the stream fan-out, and tests all observe the same stream of
//! [`ProgressUpdate`] events without the executor needing to know who (if
//! anyone) is listening.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// A single progress or lifecycle event emitted by an executor while an
/// operation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProgressUpdate {
    /// Emitted once, immediately after the manager transitions a record to `running`.
    Started {
        operation_id: String,
        operation_type: String,
        description: String,
    },
    /// Emitted whenever an executor has a new progress percentage or step label.
    Progress {
        operation_id: String,
        message: String,
        percentage: Option<f64>,
        current_step: Option<String>,
    },
    /// Emitted for incremental output an executor wants observers to see
    /// (e.g. a per-disk SMART scan line, a per-container bulk result).
    Output {
        operation_id: String,
        line: String,
        is_error: bool,
    },
    /// Emitted once an executor has finished successfully.
    Completed {
        operation_id: String,
        message: String,
        duration_ms: u64,
    },
    /// Emitted once an executor has finished unsuccessfully.
    Failed {
        operation_id: String,
        error: String,
        duration_ms: u64,
    },
    /// Emitted once the manager has observed a cancellation.
    Cancelled {
        operation_id: String,
        message: String,
        duration_ms: u64,
    },
}

impl ProgressUpdate {
    pub fn operation_id(&self) -> &str {
        match self {
            ProgressUpdate::Started { operation_id, .. }
            | ProgressUpdate::Progress { operation_id, .. }
            | ProgressUpdate::Output { operation_id, .. }
            | ProgressUpdate::Completed { operation_id, .. }
            | ProgressUpdate::Failed { operation_id, .. }
            | ProgressUpdate::Cancelled { operation_id, .. } => operation_id,
        }
    }
}

/// Errors that can occur while delivering a [`ProgressUpdate`].
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("failed to send progress update: {0}")]
    SendFailed(String),
    #[error("callback receiver disconnected")]
    Disconnected,
    #[error("operation cancelled")]
    Cancelled,
}

/// Receives progress updates for an in-flight operation and can be polled
/// for a cooperative cancellation request.
///
/// Implementations must be cheap to clone (typically an `Arc`-backed
/// channel handle) since an executor holds one for the lifetime of a call.
#[async_trait]
pub trait CallbackSender: Send + Sync {
    async fn send_progress(&self, update: ProgressUpdate) -> Result<(), CallbackError>;

    /// Advisory poll; executors should check this at every suspension point,
    /// but the authoritative cancellation signal is the `CancellationToken`
    /// carried by the operation record.
    async fn should_cancel(&self) -> bool {
        false
    }

    async fn send_batch(&self, updates: Vec<ProgressUpdate>) -> Result<(), CallbackError> {
        for update in updates {
            self.send_progress(update).await?;
        }
        Ok(())
    }
}

/// Sends progress updates over an mpsc channel, e.g. to the stream fan-out.
#[derive(Clone)]
pub struct ChannelCallbackSender {
    sender: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelCallbackSender {
    pub fn new(sender: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl CallbackSender for ChannelCallbackSender {
    async fn send_progress(&self, update: ProgressUpdate) -> Result<(), CallbackError> {
        self.sender
            .send(update)
            .map_err(|e| CallbackError::SendFailed(e.to_string()))
    }
}

/// Discards every update. Used when nothing is listening (e.g. fire-and-forget
/// executor invocations in tests).
#[derive(Debug, Clone, Default)]
pub struct NoOpCallbackSender;

#[async_trait]
impl CallbackSender for NoOpCallbackSender {
    async fn send_progress(&self, _update: ProgressUpdate) -> Result<(), CallbackError> {
        Ok(())
    }
}

/// Logs every update at `debug` level via `tracing`. Useful for the
/// demonstration binary and for tests that only care that progress was
/// reported, not its destination.
#[derive(Debug, Clone, Default)]
pub struct LoggingCallbackSender;

#[async_trait]
impl CallbackSender for LoggingCallbackSender {
    async fn send_progress(&self, update: ProgressUpdate) -> Result<(), CallbackError> {
        match &update {
            ProgressUpdate::Started {
                operation_id,
                operation_type,
                ..
            } => {
                tracing::debug!(operation_id, operation_type, "operation started");
            }
            ProgressUpdate::Progress {
                operation_id,
                percentage,
                message,
                ..
            } => {
                tracing::debug!(operation_id, ?percentage, message, "operation progress");
            }
            ProgressUpdate::Output {
                operation_id, line, ..
            } => {
                tracing::debug!(operation_id, line, "operation output");
            }
            ProgressUpdate::Completed {
                operation_id,
                duration_ms,
                ..
            } => {
                tracing::debug!(operation_id, duration_ms, "operation completed");
            }
            ProgressUpdate::Failed {
                operation_id,
                error,
                ..
            } => {
                tracing::warn!(operation_id, error, "operation failed");
            }
            ProgressUpdate::Cancelled { operation_id, .. } => {
                tracing::debug!(operation_id, "operation cancelled");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sender_forwards_updates() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = ChannelCallbackSender::new(tx);
        sender
            .send_progress(ProgressUpdate::Started {
                operation_id: "op-1".to_string(),
                operation_type: "parity_check".to_string(),
                description: "parity check".to_string(),
            })
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.operation_id(), "op-1");
    }

    #[tokio::test]
    async fn channel_sender_errors_after_receiver_drop() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sender = ChannelCallbackSender::new(tx);
        let result = sender
            .send_progress(ProgressUpdate::Cancelled {
                operation_id: "op-1".to_string(),
                message: "cancelled".to_string(),
                duration_ms: 0,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn noop_sender_always_succeeds() {
        let sender = NoOpCallbackSender;
        assert!(
            sender
                .send_progress(ProgressUpdate::Failed {
                    operation_id: "op-1".to_string(),
                    error: "boom".to_string(),
                    duration_ms: 1,
                })
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn batch_send_preserves_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = ChannelCallbackSender::new(tx);
        sender
            .send_batch(vec![
                ProgressUpdate::Progress {
                    operation_id: "op-1".to_string(),
                    message: "step 1".to_string(),
                    percentage: Some(10.0),
                    current_step: None,
                },
                ProgressUpdate::Progress {
                    operation_id: "op-1".to_string(),
                    message: "step 2".to_string(),
                    percentage: Some(20.0),
                    current_step: None,
                },
            ])
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        match (first, second) {
            (
                ProgressUpdate::Progress { percentage: p1, .. },
                ProgressUpdate::Progress { percentage: p2, .. },
            ) => {
                assert_eq!(p1, Some(10.0));
                assert_eq!(p2, Some(20.0));
            }
            _ => panic!("unexpected update variants"),
        }
    }
}
