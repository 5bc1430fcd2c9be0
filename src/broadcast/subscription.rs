//! Viewer-side subscription handle

use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::broadcaster::Broadcaster;
use super::entry::SubscriberId;

/// Receiving half of one viewer's queue
///
/// Dropping the subscription unregisters the viewer and frees any payloads
/// still queued for it.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Bytes>,
    broadcaster: Broadcaster,
}

impl Subscription {
    pub(super) fn new(id: SubscriberId, rx: mpsc::Receiver<Bytes>, broadcaster: Broadcaster) -> Self {
        Self {
            id,
            rx,
            broadcaster,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next payload; `None` once the broadcaster closed the queue
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Poll-based variant of [`recv`](Self::recv) for hand-written streams
    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }

    /// Take a queued payload without waiting
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.unregister(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
