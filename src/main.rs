//! Feedback relay server
//!
//! Configuration comes from the environment:
//!
//!   PORT                       listening port (default 4000)
//!   CLIENT_ORIGIN              allowed CORS origin (default `*`)
//!   RELAY_UPLOAD_DIR           screenshot directory (default ./uploads)
//!   RELAY_PUBLIC_DIR           viewer bundle directory (default ./public)
//!   RELAY_SUBSCRIBER_CAPACITY  queued events per viewer (default 4)
//!
//! Log verbosity follows `RUST_LOG`, e.g. `RUST_LOG=feedback_relay=debug`.

use feedback_relay::{RelayConfig, RelayServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> feedback_relay::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("feedback_relay=info".parse().expect("valid directive"))
                .add_directive("tower_http=info".parse().expect("valid directive")),
        )
        .init();

    let config = RelayConfig::from_env();
    tracing::info!(
        port = config.advertised_port(),
        origin = %config.allowed_origin,
        capacity = config.subscriber_capacity,
        "Starting feedback relay"
    );

    let server = RelayServer::new(config);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
}
