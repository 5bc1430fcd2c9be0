//! Broadcaster implementation
//!
//! Maintains the set of connected viewers and publishes payloads to each of
//! them without blocking on any single one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::config::BroadcastConfig;
use super::entry::{Delivery, Subscriber, SubscriberId};
use super::subscription::Subscription;

/// Per-publish delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Subscribers whose queue accepted the payload
    pub delivered: usize,
    /// Subscribers whose queue was full
    pub dropped: usize,
    /// Subscribers that disconnected mid-publish
    pub closed: usize,
}

/// Broadcaster-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Total `publish` calls
    pub published: u64,
    /// Total payloads queued across all subscribers
    pub delivered: u64,
    /// Total payloads dropped on full queues
    pub dropped: u64,
}

impl std::fmt::Display for BroadcastStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "subscribers={} published={} delivered={} dropped={}",
            self.subscribers, self.published, self.delivered, self.dropped
        )
    }
}

/// Fan-out hub for serialized events
///
/// Cheap to clone; all clones share the same subscriber set.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    /// Registered subscribers. A sync mutex so `Subscription::drop` can
    /// unregister without an async context.
    subscribers: Mutex<HashMap<SubscriberId, Arc<Subscriber>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    config: BroadcastConfig,
}

impl Broadcaster {
    /// Create a broadcaster with default configuration
    pub fn new() -> Self {
        Self::with_config(BroadcastConfig::default())
    }

    /// Create a broadcaster with custom configuration
    pub fn with_config(config: BroadcastConfig) -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                published: AtomicU64::new(0),
                delivered: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
                config,
            }),
        }
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.inner.config
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<SubscriberId, Arc<Subscriber>>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new viewer
    ///
    /// The returned subscription unregisters itself when dropped. After
    /// `close_all` the subscription is created already closed.
    pub fn register(&self) -> Subscription {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.inner.config.queue_capacity);

        let count = {
            // Checked under the lock so a concurrent close_all cannot miss us
            let mut subscribers = self.subscribers();
            if self.inner.closed.load(Ordering::Acquire) {
                tracing::debug!(subscriber = %id, "Broadcaster closed, subscription ends immediately");
                return Subscription::new(id, rx, self.clone());
            }
            subscribers.insert(id, Arc::new(Subscriber::new(id, tx)));
            subscribers.len()
        };

        tracing::info!(subscriber = %id, subscribers = count, "Subscriber registered");

        Subscription::new(id, rx, self.clone())
    }

    /// Remove a viewer and release its queue
    ///
    /// Idempotent and safe to call while a publish is in flight: a publish
    /// that already snapshotted the sender sees the queue as closed.
    pub fn unregister(&self, id: SubscriberId) {
        let (removed, count) = {
            let mut subscribers = self.subscribers();
            let removed = subscribers.remove(&id);
            (removed, subscribers.len())
        };

        if let Some(subscriber) = removed {
            tracing::info!(
                subscriber = %id,
                subscribers = count,
                dropped = subscriber.dropped(),
                connected_secs = subscriber.age().as_secs(),
                "Subscriber unregistered"
            );
        }
    }

    /// Offer a payload to every registered subscriber
    ///
    /// Never waits on a subscriber. A full queue drops the payload for that
    /// subscriber only.
    pub fn publish(&self, payload: Bytes) -> PublishOutcome {
        let snapshot: Vec<Arc<Subscriber>> = self.subscribers().values().cloned().collect();

        let mut outcome = PublishOutcome::default();
        for subscriber in &snapshot {
            match subscriber.offer(payload.clone()) {
                Delivery::Delivered => outcome.delivered += 1,
                Delivery::Full => {
                    outcome.dropped += 1;
                    tracing::trace!(subscriber = %subscriber.id(), "Queue full, payload dropped");
                }
                Delivery::Closed => outcome.closed += 1,
            }
        }

        self.inner.published.fetch_add(1, Ordering::Relaxed);
        self.inner
            .delivered
            .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
        self.inner
            .dropped
            .fetch_add(outcome.dropped as u64, Ordering::Relaxed);

        tracing::debug!(
            bytes = payload.len(),
            delivered = outcome.delivered,
            dropped = outcome.dropped,
            closed = outcome.closed,
            "Payload published"
        );

        outcome
    }

    /// Close every subscriber queue (server shutdown)
    ///
    /// Open streams drain what is already queued and then end.
    pub fn close_all(&self) {
        let drained: Vec<_> = {
            let mut subscribers = self.subscribers();
            self.inner.closed.store(true, Ordering::Release);
            subscribers.drain().collect()
        };

        tracing::info!(subscribers = drained.len(), stats = %self.stats(), "Broadcaster closed");
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Whether a subscriber is still registered
    pub fn is_registered(&self, id: SubscriberId) -> bool {
        self.subscribers().contains_key(&id)
    }

    /// Snapshot of broadcaster counters
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            subscribers: self.subscriber_count(),
            published: self.inner.published.load(Ordering::Relaxed),
            delivered: self.inner.delivered.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.inner.config)
            .finish()
    }
}
