//! HTTP server for the relay
//!
//! ```text
//!   producer ──POST /api/feedback──► Relay ──► StateCache (latest)
//!                                      │
//!                                      └──► Broadcaster ──► ViewerStream ──► GET /api/stream
//!                                                      └──► ViewerStream ──► GET /api/stream
//! ```

pub mod assets;
pub mod config;
pub mod listener;
pub mod router;
pub mod stream;

pub use config::RelayConfig;
pub use listener::RelayServer;
pub use router::build_router;
pub use stream::{ViewerState, ViewerStream};
