//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::broadcast::config::DEFAULT_QUEUE_CAPACITY;
use crate::discovery::DEFAULT_QR_SIZE;
use crate::ingest::DEFAULT_MAX_SCROLL_DELTA;

/// Default listening port
pub const DEFAULT_PORT: u16 = 4000;

/// Relay configuration options
///
/// Built once at startup and handed to each component; nothing below the
/// binary reads the process environment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Value of `Access-Control-Allow-Origin` (`*` allows any origin)
    pub allowed_origin: String,

    /// Directory stored screenshots are written to and served from
    pub upload_dir: PathBuf,

    /// Directory holding the viewer application bundle
    pub public_dir: PathBuf,

    /// Queue slots per connected viewer
    pub subscriber_capacity: usize,

    /// Cache lifetime advertised for stored screenshots
    pub upload_max_age: Duration,

    /// Maximum accepted request body size
    pub max_body_bytes: usize,

    /// Bound on scroll control deltas
    pub max_scroll_delta: i64,

    /// Rendered QR code size in pixels
    pub qr_size: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            allowed_origin: "*".to_string(),
            upload_dir: PathBuf::from("./uploads"),
            public_dir: PathBuf::from("./public"),
            subscriber_capacity: DEFAULT_QUEUE_CAPACITY,
            upload_max_age: Duration::from_secs(300),
            max_body_bytes: 25 * 1024 * 1024, // 25MB, screenshots arrive inline
            max_scroll_delta: DEFAULT_MAX_SCROLL_DELTA,
            qr_size: DEFAULT_QR_SIZE,
        }
    }
}

impl RelayConfig {
    /// Build from `PORT`, `CLIENT_ORIGIN`, `RELAY_UPLOAD_DIR`,
    /// `RELAY_PUBLIC_DIR` and `RELAY_SUBSCRIBER_CAPACITY`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unparsable values keep defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PORT").and_then(|v| v.parse::<u16>().ok()) {
            config = config.port(port);
        }
        if let Some(origin) = get("CLIENT_ORIGIN") {
            config.allowed_origin = origin;
        }
        if let Some(dir) = get("RELAY_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("RELAY_PUBLIC_DIR") {
            config.public_dir = PathBuf::from(dir);
        }
        if let Some(capacity) = get("RELAY_SUBSCRIBER_CAPACITY").and_then(|v| v.parse().ok()) {
            config = config.subscriber_capacity(capacity);
        }

        config
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Keep the bind IP, change the port
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Port advertised to viewers by discovery
    pub fn advertised_port(&self) -> u16 {
        self.bind_addr.port()
    }

    /// Set the allowed cross-origin value
    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origin = origin.into();
        self
    }

    /// Set the screenshot directory
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Set the viewer bundle directory
    pub fn public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = dir.into();
        self
    }

    /// Set per-viewer queue capacity (at least one slot)
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Set screenshot cache lifetime
    pub fn upload_max_age(mut self, max_age: Duration) -> Self {
        self.upload_max_age = max_age;
        self
    }

    /// Set the request body limit
    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}
