//! Screenshot ingestion and persistence
//!
//! This module provides:
//! - Embedded image (data URL) parsing and base64 decoding
//! - Write-once storage of decoded screenshots under generated names

pub mod data_url;
pub mod screenshot;

pub use data_url::{EmbeddedImage, ImageKind};
pub use screenshot::ScreenshotStore;
