//! Relay server listener
//!
//! Binds the TCP socket and drives the HTTP router until shutdown.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use crate::broadcast::{BroadcastConfig, Broadcaster};
use crate::error::Result;
use crate::ingest::Relay;
use crate::server::config::RelayConfig;
use crate::server::router::build_router;
use crate::storage::ScreenshotStore;

/// Feedback relay server
pub struct RelayServer {
    config: RelayConfig,
    relay: Relay,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: RelayConfig) -> Self {
        let broadcaster = Broadcaster::with_config(
            BroadcastConfig::default().queue_capacity(config.subscriber_capacity),
        );
        let relay = Relay::new(ScreenshotStore::new(&config.upload_dir), broadcaster)
            .max_scroll_delta(config.max_scroll_delta);

        Self { config, relay }
    }

    /// Shared relay state (cache, broadcaster, screenshot store)
    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Router serving the full HTTP surface
    pub fn router(&self) -> Router {
        build_router(&self.config, self.relay.clone())
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.relay.store().init().await?;

        let addr: SocketAddr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            uploads = %self.config.upload_dir.display(),
            public = %self.config.public_dir.display(),
            "Relay server listening"
        );

        // Open event streams never finish on their own; closing every queue
        // lets graceful shutdown complete
        let broadcaster = self.relay.broadcaster().clone();
        let shutdown = async move {
            shutdown.await;
            tracing::info!(stats = %broadcaster.stats(), "Shutdown signal received");
            broadcaster.close_all();
        };

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Relay server stopped");
        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("bind_addr", &self.config.bind_addr)
            .field("viewers", &self.relay.broadcaster().subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::time::{sleep, timeout, Instant};

    use super::*;
    use crate::event::FeedbackSubmission;

    const WAIT: Duration = Duration::from_secs(5);

    struct Running {
        addr: SocketAddr,
        relay: Relay,
        stop: oneshot::Sender<()>,
        handle: tokio::task::JoinHandle<Result<()>>,
        _dirs: (tempfile::TempDir, tempfile::TempDir),
    }

    async fn start() -> Running {
        let uploads = tempfile::tempdir().unwrap();
        let public = tempfile::tempdir().unwrap();
        let config = RelayConfig::default()
            .upload_dir(uploads.path())
            .public_dir(public.path());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = RelayServer::new(config);
        let relay = server.relay().clone();

        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = stopped.await;
                })
                .await
        });

        Running {
            addr,
            relay,
            stop,
            handle,
            _dirs: (uploads, public),
        }
    }

    async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
        let mut seen = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before {:?}", needle);
            seen.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&seen).into_owned();
            if text.contains(needle) {
                return text;
            }
        }
    }

    async fn wait_for_viewers(relay: &Relay, expected: usize) {
        let deadline = Instant::now() + WAIT;
        while relay.broadcaster().subscriber_count() != expected {
            assert!(Instant::now() < deadline, "viewer count never reached {}", expected);
            sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let running = start().await;

        let mut client = TcpStream::connect(running.addr).await.unwrap();
        client
            .write_all(b"GET /api/latest HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let response = timeout(WAIT, read_until(&mut client, "no feedback yet")).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 404"));

        running.stop.send(()).unwrap();
        timeout(WAIT, running.handle).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stream_over_tcp_and_disconnect() {
        let running = start().await;

        let mut viewer = TcpStream::connect(running.addr).await.unwrap();
        viewer
            .write_all(b"GET /api/stream HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let head = timeout(WAIT, read_until(&mut viewer, "\r\n\r\n")).await.unwrap();
        assert!(head.starts_with("HTTP/1.1 200"));
        assert!(head.to_ascii_lowercase().contains("content-type: text/event-stream"));
        wait_for_viewers(&running.relay, 1).await;

        running
            .relay
            .ingest(FeedbackSubmission::new("live").with_meta(
                serde_json::json!({ "mode": "audio" }).as_object().unwrap().clone(),
            ))
            .await
            .unwrap();
        let frame = timeout(WAIT, read_until(&mut viewer, "\"feedback\":\"live\"")).await.unwrap();
        assert!(frame.contains("data: {"));

        drop(viewer);
        wait_for_viewers(&running.relay, 0).await;

        running.stop.send(()).unwrap();
        timeout(WAIT, running.handle).await.unwrap().unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_open_streams() {
        let running = start().await;

        let mut viewer = TcpStream::connect(running.addr).await.unwrap();
        viewer
            .write_all(b"GET /api/stream HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        timeout(WAIT, read_until(&mut viewer, "\r\n\r\n")).await.unwrap();
        wait_for_viewers(&running.relay, 1).await;

        running.stop.send(()).unwrap();
        timeout(WAIT, running.handle).await.unwrap().unwrap().unwrap();
        assert_eq!(running.relay.broadcaster().subscriber_count(), 0);
    }
}
