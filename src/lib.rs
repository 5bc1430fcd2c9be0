//! Feedback relay
//!
//! Accepts feedback events (text, an optional screenshot and free-form
//! metadata) from a producer over HTTP, remembers the most recent one, and
//! pushes every event to connected viewers as server-sent events. A viewer
//! that connects late is first sent the latest event.
//!
//! # Example
//!
//! ```no_run
//! use feedback_relay::{RelayConfig, RelayServer};
//!
//! #[tokio::main]
//! async fn main() -> feedback_relay::Result<()> {
//!     let server = RelayServer::new(RelayConfig::default().port(4000));
//!     server.run().await
//! }
//! ```

pub mod broadcast;
pub mod cache;
pub mod discovery;
pub mod error;
pub mod event;
pub mod ingest;
pub mod server;
pub mod storage;

pub use broadcast::{BroadcastStats, Broadcaster};
pub use cache::{CachedEvent, StateCache};
pub use discovery::{Discovery, DiscoveryInfo};
pub use error::{RelayError, Result};
pub use event::{ControlEvent, ControlRequest, FeedbackEvent, FeedbackSubmission};
pub use ingest::Relay;
pub use server::{RelayConfig, RelayServer};
pub use storage::ScreenshotStore;
