//! Single-slot state cache
//!
//! Holds the most recent feedback event together with its pre-serialized wire
//! form, so hydrating a viewer or answering `GET /api/latest` never
//! re-serializes. The slot is replaced wholesale on every ingest; readers get
//! an `Arc` snapshot and never observe a partially written value.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::event::FeedbackEvent;

/// Immutable snapshot of the cached event
#[derive(Debug)]
pub struct CachedEvent {
    event: FeedbackEvent,
    bytes: Bytes,
}

impl CachedEvent {
    /// Encode the event once and keep both forms together
    pub fn new(event: FeedbackEvent) -> Result<Self> {
        let bytes = event.encode()?;
        Ok(Self { event, bytes })
    }

    pub fn event(&self) -> &FeedbackEvent {
        &self.event
    }

    /// Serialized wire form (reference counted, cheap to clone)
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }
}

/// Cache of the latest event
///
/// The lock guards a pointer swap plus whatever non-blocking work the caller
/// attaches to it; it is never held across I/O or an `.await`.
#[derive(Debug, Default)]
pub struct StateCache {
    latest: RwLock<Option<Arc<CachedEvent>>>,
}

impl StateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached snapshot
    pub async fn set_latest(&self, cached: CachedEvent) -> Arc<CachedEvent> {
        self.set_latest_and(cached, |_| ()).await.0
    }

    /// Replace the cached snapshot and run `then` before the lock is released
    ///
    /// Anything `then` does (a publish) is ordered with respect to
    /// `with_latest` callers: they observe either the old snapshot and none
    /// of its effects, or the new snapshot and all of them.
    pub async fn set_latest_and<F, R>(&self, cached: CachedEvent, then: F) -> (Arc<CachedEvent>, R)
    where
        F: FnOnce(&Arc<CachedEvent>) -> R,
    {
        let cached = Arc::new(cached);
        let out = {
            let mut slot = self.latest.write().await;
            *slot = Some(Arc::clone(&cached));
            then(&cached)
        };

        tracing::debug!(id = %cached.event().id(), bytes = cached.bytes.len(), "Latest event cached");
        (cached, out)
    }

    /// Run `f` against the latest snapshot while no replacement can happen
    pub async fn with_latest<F, R>(&self, f: F) -> R
    where
        F: FnOnce(Option<&Arc<CachedEvent>>) -> R,
    {
        let slot = self.latest.read().await;
        f(slot.as_ref())
    }

    /// Snapshot of the latest event, or `None` before the first ingest
    pub async fn get_latest(&self) -> Option<Arc<CachedEvent>> {
        self.latest.read().await.clone()
    }

    /// Whether an event has been cached yet
    pub async fn is_empty(&self) -> bool {
        self.latest.read().await.is_none()
    }
}
