//! Broadcaster configuration

/// Default number of queued payloads per viewer
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Configuration for the broadcaster
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Slots in each subscriber's queue before payloads are dropped
    pub queue_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl BroadcastConfig {
    /// Set the per-subscriber queue capacity (at least one slot)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}
