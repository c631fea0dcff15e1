//! Event fan-out to event-stream subscribers.
//!
//! Each subscriber owns a bounded queue. Publishing never blocks: a
//! subscriber whose queue is full (or whose receiver is gone) is evicted,
//! which closes its queue. Delivery order per subscriber matches publish
//! order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::types::HubEvent;

/// Default per-subscriber queue capacity.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 10;

/// One registered subscriber.
struct ClientConnection {
    /// Unique subscriber id (`client_<uuid>`).
    id: String,
    tx: mpsc::Sender<Arc<String>>,
    connected_at: Instant,
    delivered: AtomicU64,
}

impl ClientConnection {
    fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            delivered: AtomicU64::new(0),
        }
    }

    fn send(&self, message: Arc<String>) -> Result<(), TrySendError<Arc<String>>> {
        self.tx.try_send(message)?;
        let _ = self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Messages queued for this subscriber so far.
    fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Connection age.
    fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    fn stats(&self) -> SubscriberStats {
        SubscriberStats {
            client_id: self.id.clone(),
            delivered: self.delivered(),
            connected_secs: self.age().as_secs(),
        }
    }
}

/// Point-in-time view of one subscriber, as reported by `/health`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberStats {
    /// Subscriber id.
    pub client_id: String,
    /// Events queued for it so far.
    pub delivered: u64,
    /// Seconds since it subscribed.
    pub connected_secs: u64,
}

/// Receiving side of a subscription.
///
/// Dropping it unregisters the subscriber.
pub struct Subscription {
    id: String,
    rx: mpsc::Receiver<Arc<String>>,
    hub: Weak<BroadcastHub>,
}

impl Subscription {
    /// Subscriber id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next encoded event, or `None` once the subscriber was evicted or
    /// unsubscribed and the queue is drained.
    pub async fn recv(&mut self) -> Option<Arc<String>> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            let _ = hub.unsubscribe(&self.id);
        }
    }
}

/// Registry of subscribers and their queues.
pub struct BroadcastHub {
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
    capacity: usize,
}

impl BroadcastHub {
    /// Create a hub whose subscribers each get a queue of `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Per-subscriber queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register a new subscriber.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = format!("client_{}", uuid::Uuid::now_v7());
        let (tx, rx) = mpsc::channel(self.capacity);
        let conn = Arc::new(ClientConnection::new(id.clone(), tx));
        let _ = self.connections.write().insert(id.clone(), conn);
        info!(client_id = %id, "subscriber connected");
        Subscription {
            id,
            rx,
            hub: Arc::downgrade(self),
        }
    }

    /// Remove a subscriber and close its queue. Returns whether it existed.
    pub fn unsubscribe(&self, id: &str) -> bool {
        let removed = self.connections.write().remove(id).is_some();
        if removed {
            info!(client_id = %id, "subscriber disconnected");
        }
        removed
    }

    /// Publish an event to every subscriber. Returns the number of
    /// subscribers that accepted it.
    pub fn publish(&self, event: &HubEvent) -> usize {
        let json = match serde_json::to_string(event) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(event_type = event.event_type, error = %e, "failed to serialize event");
                return 0;
            }
        };

        let mut evicted = Vec::new();
        let mut accepted = 0;
        {
            let conns = self.connections.read();
            for conn in conns.values() {
                match conn.send(Arc::clone(&json)) {
                    Ok(()) => accepted += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(client_id = %conn.id, "subscriber queue full, evicting");
                        evicted.push(conn.id.clone());
                    }
                    Err(TrySendError::Closed(_)) => evicted.push(conn.id.clone()),
                }
            }
        }

        if !evicted.is_empty() {
            let mut conns = self.connections.write();
            for id in &evicted {
                let _ = conns.remove(id);
            }
        }

        debug!(
            event_type = event.event_type,
            recipients = accepted,
            evicted = evicted.len(),
            "published event"
        );
        accepted
    }

    /// Number of registered subscribers.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Stats for every registered subscriber, oldest first.
    pub fn subscribers(&self) -> Vec<SubscriberStats> {
        let mut stats: Vec<SubscriberStats> =
            self.connections.read().values().map(|c| c.stats()).collect();
        stats.sort_by(|a, b| {
            b.connected_secs
                .cmp(&a.connected_secs)
                .then_with(|| a.client_id.cmp(&b.client_id))
        });
        stats
    }

    /// Whether a subscriber is still registered.
    pub fn is_subscribed(&self, id: &str) -> bool {
        self.connections.read().contains_key(id)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}
