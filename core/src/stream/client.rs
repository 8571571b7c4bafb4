//! A single stream fan-out client: its subscription map and outbound queue.
//!
//! `ClientHandle` itself is transport-agnostic — it doesn't know whether the
//! other end is a WebSocket, a test harness, or anything else. The
//! transport (e.g. `arrayd-server`'s `ws.rs`) owns the actual socket and the
//! reader/writer duty tasks; it hands parsed [`ClientMessage`]s to
//! [`ClientHandle::handle_message`] and drains [`ClientHandle::outbound`] to
//! write frames.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};

use super::message::{ClientAction, ClientMessage, ServerMessage};
use super::subscription::Subscription;

/// A connected client's state: its id, outbound queue, and subscriptions.
pub struct ClientHandle {
    id: String,
    outbound: mpsc::Sender<ServerMessage>,
    subscriptions: RwLock<HashMap<String, Subscription>>,
    default_interval: Duration,
}

/// The receiving half returned alongside a freshly registered
/// [`ClientHandle`]; the transport drains this to write frames.
pub struct ClientSession {
    pub handle: std::sync::Arc<ClientHandle>,
    pub outbound_rx: mpsc::Receiver<ServerMessage>,
}

impl ClientHandle {
    pub fn new(id: String, queue_capacity: usize, default_interval: Duration) -> ClientSession {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let handle = std::sync::Arc::new(Self {
            id,
            outbound: tx,
            subscriptions: RwLock::new(HashMap::new()),
            default_interval,
        });
        ClientSession {
            handle,
            outbound_rx: rx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attempt to enqueue a message without blocking. Returns `false` if the
    /// queue is full or the receiver (writer duty) is gone — the caller's
    /// backpressure policy is to disconnect the client in that case.
    pub fn try_send(&self, message: ServerMessage) -> bool {
        self.outbound.try_send(message).is_ok()
    }

    /// Apply an inbound client message, returning an acknowledgement to
    /// enqueue (if any). Unknown actions never reach here — the transport's
    /// JSON deserialization rejects them before this point, per the
    /// "unknown action: log and ignore" rule; a still-unrecognized action
    /// variant (none exist today) would also fall through to `None`.
    pub async fn handle_message(&self, message: ClientMessage) -> Option<ServerMessage> {
        match message.action {
            ClientAction::Subscribe => {
                let interval_secs = message.interval.unwrap_or(self.default_interval.as_secs());
                let mut subs = self.subscriptions.write().await;
                for metric in &message.metrics {
                    subs.insert(
                        metric.clone(),
                        Subscription::new(
                            metric.clone(),
                            message.interval,
                            message.filters.clone(),
                            self.default_interval,
                        ),
                    );
                }
                Some(ServerMessage::subscribed(message.metrics, interval_secs))
            }
            ClientAction::Unsubscribe => {
                let mut subs = self.subscriptions.write().await;
                for metric in &message.metrics {
                    subs.remove(metric);
                }
                None
            }
            ClientAction::List => {
                let subs = self.subscriptions.read().await;
                Some(ServerMessage::subscriptions(subs.keys().cloned().collect()))
            }
        }
    }

    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    /// Non-blocking best-effort subscription count. Returns `None` if the
    /// lock is momentarily held by a concurrent subscribe/unsubscribe.
    pub fn try_subscription_count(&self) -> Option<usize> {
        self.subscriptions.try_read().ok().map(|subs| subs.len())
    }

    /// Iterate due subscriptions, marking each as sent as of `now` once its
    /// metric value has been fetched and enqueued by the caller.
    pub async fn due_subscriptions(&self, now: std::time::SystemTime) -> Vec<Subscription> {
        self.subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.is_due(now))
            .cloned()
            .collect()
    }

    pub async fn mark_sent(&self, metric: &str, now: std::time::SystemTime) {
        if let Some(sub) = self.subscriptions.write().await.get_mut(metric) {
            sub.last_sent = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_session() -> ClientSession {
        ClientHandle::new("client-1".to_string(), 4, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn subscribe_upserts_and_acks() {
        let session = new_session();
        let msg = ClientMessage {
            action: ClientAction::Subscribe,
            metrics: vec!["cpu".to_string()],
            interval: Some(2),
            filters: None,
        };
        let ack = session.handle.handle_message(msg).await.unwrap();
        match ack {
            ServerMessage::Subscribed { metrics, interval, .. } => {
                assert_eq!(metrics, vec!["cpu"]);
                assert_eq!(interval, 2);
            }
            other => panic!("unexpected ack: {other:?}"),
        }
        assert_eq!(session.handle.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_metric() {
        let session = new_session();
        session
            .handle
            .handle_message(ClientMessage {
                action: ClientAction::Subscribe,
                metrics: vec!["cpu".to_string(), "mem".to_string()],
                interval: None,
                filters: None,
            })
            .await;
        session
            .handle
            .handle_message(ClientMessage {
                action: ClientAction::Unsubscribe,
                metrics: vec!["cpu".to_string()],
                interval: None,
                filters: None,
            })
            .await;
        assert_eq!(session.handle.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn list_echoes_current_subscriptions() {
        let session = new_session();
        session
            .handle
            .handle_message(ClientMessage {
                action: ClientAction::Subscribe,
                metrics: vec!["cpu".to_string()],
                interval: None,
                filters: None,
            })
            .await;
        let ack = session
            .handle
            .handle_message(ClientMessage {
                action: ClientAction::List,
                metrics: vec![],
                interval: None,
                filters: None,
            })
            .await
            .unwrap();
        match ack {
            ServerMessage::Subscriptions { metrics, .. } => assert_eq!(metrics, vec!["cpu"]),
            other => panic!("unexpected ack: {other:?}"),
        }
    }

    #[tokio::test]
    async fn try_send_fails_once_queue_is_full() {
        let session = ClientHandle::new("client-2".to_string(), 1, Duration::from_secs(5));
        let msg = || ServerMessage::subscriptions(vec![]);
        assert!(session.handle.try_send(msg()));
        assert!(!session.handle.try_send(msg()));
    }
}
