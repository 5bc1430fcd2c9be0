//! Subscriber entries
//!
//! The per-viewer state stored in the broadcaster. Only the sending half of the
//! queue lives here; the receiving half belongs to the viewer's `Subscription`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Unique identifier of a registered viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Result of offering a payload to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Payload was queued
    Delivered,
    /// Queue was full; payload dropped for this subscriber
    Full,
    /// Viewer already went away
    Closed,
}

/// One live viewer as seen by the broadcaster
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    tx: mpsc::Sender<Bytes>,
    connected_at: Instant,
    dropped: AtomicU64,
}

impl Subscriber {
    pub(super) fn new(id: SubscriberId, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Liveness: false once the viewer's receiving half is gone
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Payloads dropped for this subscriber because its queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// How long this subscriber has been registered
    pub fn age(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Non-blocking enqueue
    pub(super) fn offer(&self, payload: Bytes) -> Delivery {
        match self.tx.try_send(payload) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::Full
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
