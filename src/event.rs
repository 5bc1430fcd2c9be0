//! Feedback and control event types
//!
//! `FeedbackEvent` is the unit the relay caches and fans out. It is built once
//! at ingest time and never mutated afterwards; every submission yields a new
//! event with a fresh id.

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Opaque key/value metadata attached by the producer (hotkey, model, mode...)
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata `mode` value that marks an audio-only event
pub const AUDIO_MODE: &str = "audio";

/// URL prefix under which stored screenshots are served
pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Current time formatted as RFC 3339 UTC with second precision
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Incoming body of `POST /api/feedback`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub meta: Option<Metadata>,
}

impl FeedbackSubmission {
    /// Create a submission carrying only feedback text
    pub fn new(feedback: impl Into<String>) -> Self {
        Self {
            feedback: feedback.into(),
            ..Default::default()
        }
    }

    /// Attach an embedded image payload
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Attach producer metadata
    pub fn with_meta(mut self, meta: Metadata) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Embedded image payload, treating an empty string as absent
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether the producer flagged this as an audio-only event
    pub fn is_audio_mode(&self) -> bool {
        self.meta
            .as_ref()
            .and_then(|m| m.get("mode"))
            .and_then(|v| v.as_str())
            == Some(AUDIO_MODE)
    }
}

/// One critique cycle as seen by viewers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    id: String,
    timestamp: String,
    #[serde(rename = "feedback")]
    feedback_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    screenshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screenshot_url: Option<String>,
    meta: Metadata,
}

impl FeedbackEvent {
    /// Build a new event from a validated submission
    ///
    /// Assigns a fresh id, defaults the timestamp to now and the metadata to
    /// an empty map. `screenshot` is the stored filename, if any.
    pub fn new(
        feedback_text: String,
        timestamp: Option<String>,
        screenshot: Option<String>,
        meta: Option<Metadata>,
    ) -> Self {
        let timestamp = timestamp
            .filter(|ts| !ts.is_empty())
            .unwrap_or_else(now_rfc3339);
        let screenshot_url = screenshot
            .as_ref()
            .map(|name| format!("{}{}", UPLOADS_PREFIX, name));

        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            feedback_text,
            screenshot_id: screenshot,
            screenshot_url,
            meta: meta.unwrap_or_default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn feedback_text(&self) -> &str {
        &self.feedback_text
    }

    /// Stored screenshot filename
    pub fn screenshot_id(&self) -> Option<&str> {
        self.screenshot_id.as_deref()
    }

    /// Externally visible path of the stored screenshot
    pub fn screenshot_url(&self) -> Option<&str> {
        self.screenshot_url.as_deref()
    }

    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Serialize to the JSON wire form
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

/// Incoming body of `POST /api/control`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub delta: i64,
}

/// Viewer control command pushed through the broadcaster (never cached)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlEvent {
    #[serde(rename = "type")]
    kind: &'static str,
    pub action: String,
    pub delta: i64,
    pub timestamp: String,
}

impl ControlEvent {
    /// Create a scroll command
    pub fn scroll(delta: i64) -> Self {
        Self {
            kind: "control",
            action: "scroll".to_string(),
            delta,
            timestamp: now_rfc3339(),
        }
    }

    /// Serialize to the JSON wire form
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}
