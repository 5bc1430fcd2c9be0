//! Feedback ingestion and viewer control
//!
//! `Relay` ties the components together: it validates a submission, stores
//! its screenshot, replaces the cached latest event and publishes the wire
//! form to every connected viewer.
//!
//! All validation happens before the cache is touched. Once the cache is
//! updated, publishing cannot fail from the producer's point of view; drops
//! toward slow viewers are the backpressure policy, not an error.

use std::sync::Arc;

use bytes::Bytes;

use crate::broadcast::Broadcaster;
use crate::cache::{CachedEvent, StateCache};
use crate::error::{RelayError, Result};
use crate::event::{ControlEvent, ControlRequest, FeedbackEvent, FeedbackSubmission};
use crate::storage::ScreenshotStore;

/// Default bound on a scroll command's delta
pub const DEFAULT_MAX_SCROLL_DELTA: i64 = 2000;

/// The only supported control action
pub const SCROLL_ACTION: &str = "scroll";

/// Core relay service shared by all request handlers
#[derive(Debug, Clone)]
pub struct Relay {
    cache: Arc<StateCache>,
    broadcaster: Broadcaster,
    store: ScreenshotStore,
    max_scroll_delta: i64,
}

impl Relay {
    /// Create a relay around a screenshot store and a broadcaster
    pub fn new(store: ScreenshotStore, broadcaster: Broadcaster) -> Self {
        Self {
            cache: Arc::new(StateCache::new()),
            broadcaster,
            store,
            max_scroll_delta: DEFAULT_MAX_SCROLL_DELTA,
        }
    }

    /// Set the scroll clamp bound
    pub fn max_scroll_delta(mut self, max: i64) -> Self {
        self.max_scroll_delta = max.saturating_abs();
        self
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn store(&self) -> &ScreenshotStore {
        &self.store
    }

    /// Validate, persist, cache and publish one feedback submission
    ///
    /// A screenshot written before a later failure is left in place.
    pub async fn ingest(&self, submission: FeedbackSubmission) -> Result<Arc<CachedEvent>> {
        if submission.feedback.trim().is_empty() {
            return Err(RelayError::invalid_input("feedback is required"));
        }

        let image = submission.image();
        if image.is_none() && !submission.is_audio_mode() {
            return Err(RelayError::invalid_input("image is required"));
        }

        let screenshot = match image {
            Some(data_url) => Some(self.store.persist(data_url).await?),
            None => None,
        };

        let event = FeedbackEvent::new(
            submission.feedback,
            submission.timestamp,
            screenshot,
            submission.meta,
        );
        // Publishing inside the swap keeps the broadcast order identical to
        // the cache order, which viewer hydration relies on
        let (cached, outcome) = self
            .cache
            .set_latest_and(CachedEvent::new(event)?, |cached| {
                self.broadcaster.publish(cached.bytes())
            })
            .await;

        tracing::info!(
            id = %cached.event().id(),
            screenshot = cached.event().screenshot_id().unwrap_or("-"),
            delivered = outcome.delivered,
            dropped = outcome.dropped,
            "Feedback ingested"
        );

        Ok(cached)
    }

    /// Latest cached event
    pub async fn latest(&self) -> Result<Arc<CachedEvent>> {
        self.cache
            .get_latest()
            .await
            .ok_or_else(|| RelayError::not_found("no feedback yet"))
    }

    /// Validate a control request and push it to viewers (never cached)
    pub fn control(&self, request: ControlRequest) -> Result<Bytes> {
        if request.action != SCROLL_ACTION {
            return Err(RelayError::invalid_input("unsupported action"));
        }
        if request.delta == 0 {
            return Err(RelayError::invalid_input("delta is required"));
        }

        let delta = request
            .delta
            .clamp(-self.max_scroll_delta, self.max_scroll_delta);
        let payload = ControlEvent::scroll(delta).encode()?;
        let outcome = self.broadcaster.publish(payload.clone());

        tracing::debug!(
            delta = delta,
            requested = request.delta,
            delivered = outcome.delivered,
            "Control broadcast"
        );

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::event::Metadata;

    const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn relay() -> (Relay, TempDir) {
        let dir = tempdir().unwrap();
        let relay = Relay::new(ScreenshotStore::new(dir.path()), Broadcaster::new());
        (relay, dir)
    }

    fn audio_meta() -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("mode".into(), json!("audio"));
        meta
    }

    fn files_in(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_ingest_with_image() {
        let (relay, dir) = relay();
        let mut viewer = relay.broadcaster().register();

        let cached = relay
            .ingest(FeedbackSubmission::new("Good job").with_image(PIXEL_PNG))
            .await
            .unwrap();

        let event = cached.event();
        assert_eq!(event.feedback_text(), "Good job");
        assert!(event.screenshot_url().unwrap().starts_with("/uploads/"));
        assert!(dir.path().join(event.screenshot_id().unwrap()).is_file());

        assert_eq!(viewer.recv().await.unwrap(), cached.bytes());
        assert_eq!(relay.latest().await.unwrap().bytes(), cached.bytes());
    }

    #[tokio::test]
    async fn test_blank_feedback_rejected_without_side_effects() {
        let (relay, dir) = relay();
        let mut viewer = relay.broadcaster().register();

        let err = relay
            .ingest(FeedbackSubmission::new("   ").with_image(PIXEL_PNG))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::InvalidInput(_)));
        assert_eq!(files_in(&dir), 0);
        assert!(relay.cache().is_empty().await);
        assert!(viewer.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_image_required_unless_audio_mode() {
        let (relay, _dir) = relay();

        let err = relay
            .ingest(FeedbackSubmission::new("no picture"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "image is required");

        let cached = relay
            .ingest(FeedbackSubmission::new("spoken").with_meta(audio_meta()))
            .await
            .unwrap();
        assert!(cached.event().screenshot_id().is_none());
        assert_eq!(cached.event().meta()["mode"], "audio");
    }

    #[tokio::test]
    async fn test_audio_mode_still_requires_feedback() {
        let (relay, _dir) = relay();
        let err = relay
            .ingest(FeedbackSubmission::new("").with_meta(audio_meta()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "feedback is required");
    }

    #[tokio::test]
    async fn test_malformed_image_is_invalid_input() {
        let (relay, dir) = relay();
        let err = relay
            .ingest(FeedbackSubmission::new("x").with_image("data:image/bmp;base64,Qk0="))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::InvalidInput(_)));
        assert_eq!(files_in(&dir), 0);
        assert!(relay.latest().await.is_err());
    }

    #[tokio::test]
    async fn test_storage_failure_is_server_fault() {
        let dir = tempdir().unwrap();
        let relay = Relay::new(
            ScreenshotStore::new(dir.path().join("does-not-exist")),
            Broadcaster::new(),
        );

        let err = relay
            .ingest(FeedbackSubmission::new("x").with_image(PIXEL_PNG))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Storage { .. }));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_latest_tracks_nth_submission() {
        let (relay, _dir) = relay();
        let mut last = None;

        for i in 0..5 {
            let cached = relay
                .ingest(FeedbackSubmission::new(format!("round {}", i)).with_meta(audio_meta()))
                .await
                .unwrap();
            last = Some(cached.event().clone());
        }

        let latest = relay.latest().await.unwrap();
        assert_eq!(Some(latest.event().clone()), last);
    }

    #[tokio::test]
    async fn test_latest_empty_is_not_found() {
        let (relay, _dir) = relay();
        assert!(matches!(relay.latest().await, Err(RelayError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_control_clamps_delta() {
        let (relay, _dir) = relay();
        let mut viewer = relay.broadcaster().register();

        let payload = relay
            .control(ControlRequest {
                action: "scroll".into(),
                delta: 5000,
            })
            .unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["delta"], 2000);
        assert_eq!(viewer.recv().await.unwrap(), payload);

        let payload = relay
            .control(ControlRequest {
                action: "scroll".into(),
                delta: -9000,
            })
            .unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["delta"], -2000);
    }

    #[tokio::test]
    async fn test_extreme_clamp_bound() {
        let (relay, _dir) = relay();
        let relay = relay.max_scroll_delta(i64::MIN);

        let payload = relay
            .control(ControlRequest {
                action: "scroll".into(),
                delta: i64::MIN,
            })
            .unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["delta"], -i64::MAX);
    }

    #[tokio::test]
    async fn test_control_rejects_bad_requests() {
        let (relay, _dir) = relay();

        let err = relay
            .control(ControlRequest {
                action: "zoom".into(),
                delta: 10,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported action");

        let err = relay
            .control(ControlRequest {
                action: "scroll".into(),
                delta: 0,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "delta is required");
    }

    #[tokio::test]
    async fn test_control_is_not_cached() {
        let (relay, _dir) = relay();
        relay
            .control(ControlRequest {
                action: "scroll".into(),
                delta: 100,
            })
            .unwrap();
        assert!(relay.cache().is_empty().await);
    }
}
