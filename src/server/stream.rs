//! Per-viewer push stream
//!
//! Each `GET /api/stream` connection owns one `ViewerStream`:
//!
//! ```text
//! CONNECTING ──register──► STREAMING ──disconnect / shutdown──► CLOSED
//!                            │  1. hydration frame (latest, if any)
//!                            │  2. every payload from the queue
//! ```
//!
//! Registration and the cache snapshot happen under the cache lock, and
//! ingests publish under the same lock, so the queue only ever holds events
//! newer than the hydration frame.
//!
//! The stream is polled by the HTTP body writer, so it is woken either by a
//! queued payload or by the connection going away (the body, and with it this
//! stream, is dropped). Dropping the stream drops its `Subscription`, which
//! unregisters the viewer and frees the queue.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use crate::broadcast::{Broadcaster, SubscriberId, Subscription};
use crate::cache::StateCache;

/// Connection state of a viewer stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    /// Writing frames
    Streaming,
    /// Queue closed or viewer gone
    Closed,
}

/// Stream of serialized frames for one viewer
pub struct ViewerStream {
    subscription: Subscription,
    /// Initial frame, written before anything from the queue
    hydration: Option<Bytes>,
    state: ViewerState,
}

impl ViewerStream {
    /// Register with the broadcaster and snapshot the cache in one step
    pub async fn open(broadcaster: &Broadcaster, cache: &StateCache) -> Self {
        let (subscription, hydration) = cache
            .with_latest(|latest| (broadcaster.register(), latest.map(|cached| cached.bytes())))
            .await;

        tracing::info!(
            subscriber = %subscription.id(),
            hydrated = hydration.is_some(),
            "Viewer connected"
        );

        Self {
            subscription,
            hydration,
            state: ViewerState::Streaming,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.subscription.id()
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }
}

impl Stream for ViewerStream {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        let this = self.get_mut();

        if this.state == ViewerState::Closed {
            return Poll::Ready(None);
        }
        if let Some(frame) = this.hydration.take() {
            return Poll::Ready(Some(frame));
        }

        let polled = this.subscription.poll_recv(cx);
        if let Poll::Ready(None) = polled {
            this.state = ViewerState::Closed;
            tracing::debug!(subscriber = %this.subscription.id(), "Viewer queue closed");
        }
        polled
    }
}

impl Drop for ViewerStream {
    fn drop(&mut self) {
        self.state = ViewerState::Closed;
        tracing::info!(subscriber = %self.subscription.id(), "Viewer disconnected");
    }
}

impl std::fmt::Debug for ViewerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerStream")
            .field("id", &self.subscription.id())
            .field("state", &self.state)
            .finish()
    }
}
