//! HTTP surface
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | POST | `/api/feedback` | 201 + event JSON |
//! | GET | `/api/latest` | 200 + event JSON (404 before the first ingest) |
//! | GET | `/api/stream` | `text/event-stream`, one `data:` frame per payload |
//! | GET | `/api/info` | 200 + `{hostname, urls, generatedAt}` |
//! | GET | `/api/qr?target=` | 200 + PNG |
//! | POST | `/api/control` | 202 + control JSON |
//! | GET | `/uploads/<file>` | stored screenshot |
//! | GET | anything else | viewer bundle, falling back to `index.html` |

use std::convert::Infallible;

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::assets;
use super::config::RelayConfig;
use super::stream::ViewerStream;
use crate::discovery::{Discovery, DiscoveryInfo};
use crate::error::{RelayError, Result};
use crate::event::{ControlRequest, FeedbackSubmission};
use crate::ingest::Relay;

/// Shared state passed to all request handlers
#[derive(Debug, Clone)]
struct AppState {
    relay: Relay,
    discovery: Discovery,
}

#[derive(Debug, Deserialize)]
struct QrParams {
    target: Option<String>,
}

/// Build the complete application router
pub fn build_router(config: &RelayConfig, relay: Relay) -> Router {
    let state = AppState {
        relay,
        discovery: Discovery::new(config.advertised_port()).qr_size(config.qr_size),
    };

    Router::new()
        .route("/api/feedback", post(post_feedback))
        .route("/api/latest", get(get_latest))
        .route("/api/stream", get(get_stream))
        .route("/api/info", get(get_info))
        .route("/api/qr", get(get_qr))
        .route("/api/control", post(post_control))
        .with_state(state)
        .nest_service(
            "/uploads",
            assets::uploads_service(&config.upload_dir, config.upload_max_age),
        )
        .fallback_service(assets::spa_service(&config.public_dir))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.allowed_origin))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    if origin == "*" {
        return layer.allow_origin(Any);
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(e) => {
            tracing::warn!(origin = origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|_| RelayError::invalid_input("invalid JSON payload"))
}

fn json_bytes(status: StatusCode, body: Bytes) -> Response {
    (status, [(CONTENT_TYPE, "application/json")], body).into_response()
}

/// POST /api/feedback
async fn post_feedback(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let submission: FeedbackSubmission = parse_json(&body)?;
    let cached = state.relay.ingest(submission).await?;
    Ok(json_bytes(StatusCode::CREATED, cached.bytes()))
}

/// GET /api/latest
async fn get_latest(State(state): State<AppState>) -> Result<Response> {
    let cached = state.relay.latest().await?;
    Ok(json_bytes(StatusCode::OK, cached.bytes()))
}

/// GET /api/stream
async fn get_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let viewer = ViewerStream::open(state.relay.broadcaster(), state.relay.cache()).await;
    let frames = viewer
        .map(|frame| Ok::<_, Infallible>(Event::default().data(String::from_utf8_lossy(&frame))));

    Sse::new(frames).keep_alive(KeepAlive::default())
}

/// GET /api/info
async fn get_info(State(state): State<AppState>) -> Json<DiscoveryInfo> {
    Json(state.discovery.info())
}

/// GET /api/qr
async fn get_qr(State(state): State<AppState>, Query(params): Query<QrParams>) -> Result<Response> {
    let png = state.discovery.render_code(params.target.as_deref())?;
    Ok((
        [(CONTENT_TYPE, "image/png"), (CACHE_CONTROL, "no-store")],
        png,
    )
        .into_response())
}

/// POST /api/control
async fn post_control(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request: ControlRequest = parse_json(&body)?;
    let payload = state.relay.control(request)?;
    Ok(json_bytes(StatusCode::ACCEPTED, payload))
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RelayError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            RelayError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            RelayError::Storage { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to store screenshot".to_string(),
            ),
            RelayError::QrEncode(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to create QR code".to_string(),
            ),
            RelayError::Serialization(_) | RelayError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, message).into_response()
    }
}
