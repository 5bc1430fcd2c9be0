//! Fan-out of serialized events to live viewers
//!
//! The broadcaster owns one bounded queue per connected viewer and pushes every
//! published payload into each queue with a non-blocking send.
//!
//! # Architecture
//!
//! ```text
//!                            Broadcaster (Arc)
//!                     ┌──────────────────────────┐
//!                     │ subscribers: HashMap<Id, │
//!                     │   Subscriber {           │
//!                     │     tx: mpsc::Sender,    │
//!                     │   }                      │
//!                     │ >                        │
//!                     └────────────┬─────────────┘
//!                                  │ snapshot, then try_send
//!         ┌────────────────────────┼────────────────────────┐
//!         │                        │                        │
//!         ▼                        ▼                        ▼
//!   [Subscription]           [Subscription]           [Subscription]
//!   queue (4 slots)          queue (full: drop)       queue (4 slots)
//!         │                                                 │
//!         └──► ViewerStream ──► SSE frame ──► HTTP          └──► ...
//! ```
//!
//! # Backpressure
//!
//! A full queue drops the payload for that viewer only. The subscriber lock is
//! held just long enough to clone the sender list, so a stalled viewer never
//! delays registration, unregistration or delivery to anyone else.
//!
//! Payloads are `bytes::Bytes`; every queue shares the same allocation.

pub mod broadcaster;
pub mod config;
pub mod entry;
pub mod subscription;

pub use broadcaster::{BroadcastStats, Broadcaster, PublishOutcome};
pub use config::BroadcastConfig;
pub use entry::{Delivery, Subscriber, SubscriberId};
pub use subscription::Subscription;
