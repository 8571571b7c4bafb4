//! The process-wide streaming loop: every tick, for every client, for every
//! due subscription, fetch the metric and enqueue it. A client whose
//! outbound queue is full is disconnected rather than allowed to block the
//! loop or the metrics collector — backpressure by disconnect.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::collaborators::MetricsCollector;

use super::client::{ClientHandle, ClientSession};
use super::message::ServerMessage;

/// Aggregate counters over the current client set.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FanoutStats {
    pub connected_clients: usize,
    pub total_subscriptions: usize,
}

/// Owns the client registry and drives the periodic fan-out tick.
pub struct StreamFanout {
    clients: DashMap<String, Arc<ClientHandle>>,
    metrics: Arc<dyn MetricsCollector>,
    tick_interval: Duration,
    default_interval: Duration,
    queue_capacity: usize,
    next_id: std::sync::atomic::AtomicU64,
}

impl StreamFanout {
    pub fn new(
        metrics: Arc<dyn MetricsCollector>,
        tick_interval: Duration,
        default_interval: Duration,
        queue_capacity: usize,
    ) -> Arc<Self> {
        let fanout = Arc::new(Self {
            clients: DashMap::new(),
            metrics,
            tick_interval,
            default_interval,
            queue_capacity,
            next_id: std::sync::atomic::AtomicU64::new(1),
        });
        Self::spawn_tick_loop(Arc::downgrade(&fanout));
        fanout
    }

    /// Register a new client connection and return its handle plus the
    /// receiving half of its outbound queue for the transport to drain.
    pub fn register_client(&self) -> ClientSession {
        let id = format!(
            "client-{:08x}",
            self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        );
        let session = ClientHandle::new(id.clone(), self.queue_capacity, self.default_interval);
        self.clients.insert(id, session.handle.clone());
        session
    }

    pub fn remove_client(&self, id: &str) {
        self.clients.remove(id);
    }

    /// Cheap, synchronous, best-effort stats: `total_subscriptions` skips any
    /// client whose subscription map is momentarily locked rather than
    /// awaiting it. Use [`Self::stats_precise`] where an exact count matters.
    pub fn stats(&self) -> FanoutStats {
        let total = self
            .clients
            .iter()
            .filter_map(|entry| entry.value().try_subscription_count())
            .sum();
        FanoutStats {
            connected_clients: self.clients.len(),
            total_subscriptions: total,
        }
    }

    /// Same as [`Self::stats`] but awaits each client's subscription count;
    /// used where an accurate total matters (tests, the `/api/stats`
    /// endpoint) rather than the cheap approximation above.
    pub async fn stats_precise(&self) -> FanoutStats {
        let mut total = 0usize;
        for entry in self.clients.iter() {
            total += entry.value().subscription_count().await;
        }
        FanoutStats {
            connected_clients: self.clients.len(),
            total_subscriptions: total,
        }
    }

    fn spawn_tick_loop(fanout: std::sync::Weak<Self>) {
        tokio::spawn(async move {
            loop {
                let Some(fanout) = fanout.upgrade() else {
                    return;
                };
                let interval = fanout.tick_interval;
                drop(fanout);
                tokio::time::sleep(interval).await;
                let Some(fanout) = fanout.upgrade() else {
                    return;
                };
                fanout.tick().await;
            }
        });
    }

    async fn tick(&self) {
        let now = SystemTime::now();
        let mut dead: Vec<String> = Vec::new();

        for entry in self.clients.iter() {
            let id = entry.key().clone();
            let handle = entry.value().clone();
            let due = handle.due_subscriptions(now).await;
            for sub in due {
                let Ok(Some(value)) = self.metrics.get(&sub.metric).await else {
                    continue;
                };
                let message = ServerMessage::Data {
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    metric: sub.metric.clone(),
                    data: value,
                };
                if handle.try_send(message) {
                    handle.mark_sent(&sub.metric, now).await;
                } else {
                    dead.push(id.clone());
                    break;
                }
            }
        }

        for id in dead {
            self.clients.remove(&id);
        }
    }
}
