//! Static assets: stored screenshots and the viewer bundle

use std::path::Path;
use std::time::Duration;

use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderValue;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeader;

/// Entry document of the viewer application
pub const INDEX_FILE: &str = "index.html";

/// Screenshots with a bounded `Cache-Control` lifetime
pub fn uploads_service(dir: &Path, max_age: Duration) -> SetResponseHeader<ServeDir, HeaderValue> {
    SetResponseHeader::overriding(ServeDir::new(dir), CACHE_CONTROL, cache_control(max_age))
}

/// Viewer bundle; any path that is not a real file serves `index.html`
pub fn spa_service(public_dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(public_dir).fallback(ServeFile::new(public_dir.join(INDEX_FILE)))
}

fn cache_control(max_age: Duration) -> HeaderValue {
    HeaderValue::from_str(&format!("public, max-age={}", max_age.as_secs()))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}
