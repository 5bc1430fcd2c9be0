//! Screenshot store
//!
//! Decoded screenshots are written once into a flat directory and never
//! modified. Filenames are `<unix-millis>-<8 hex chars>.<ext>`; no existence
//! check is performed, the timestamp plus random suffix is taken as unique.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use super::data_url::{EmbeddedImage, ImageKind};
use crate::error::{RelayError, Result};

/// Length of the random filename suffix
const SUFFIX_LEN: usize = 8;

/// Flat directory of stored screenshots
#[derive(Debug, Clone)]
pub struct ScreenshotStore {
    dir: PathBuf,
}

impl ScreenshotStore {
    /// Create a store rooted at `dir` (not created until [`init`](Self::init))
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Ensure the storage directory exists
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tracing::debug!(dir = %self.dir.display(), "Screenshot directory ready");
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a stored file
    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Decode a data URL and persist it, returning the generated filename
    ///
    /// The payload is fully validated before anything touches the disk.
    pub async fn persist(&self, data_url: &str) -> Result<String> {
        let image = EmbeddedImage::parse(data_url)?;
        self.write(&image).await
    }

    /// Persist an already decoded image
    pub async fn write(&self, image: &EmbeddedImage) -> Result<String> {
        let filename = generate_filename(image.kind);
        let path = self.path_of(&filename);

        if let Err(source) = tokio::fs::write(&path, &image.data).await {
            tracing::warn!(path = %path.display(), error = %source, "Screenshot write failed");
            return Err(RelayError::Storage { path, source });
        }

        tracing::debug!(file = %filename, bytes = image.data.len(), "Screenshot stored");
        Ok(filename)
    }
}

/// `<unix-millis>-<random>.<ext>`
pub fn generate_filename(kind: ImageKind) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        &suffix[..SUFFIX_LEN],
        kind.extension()
    )
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tempfile::tempdir;

    use super::*;

    /// 1x1 transparent PNG
    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn dir_entries(path: &Path) -> usize {
        std::fs::read_dir(path).unwrap().count()
    }

    #[test]
    fn test_filename_shape() {
        let name = generate_filename(ImageKind::Jpeg);
        let (stem, ext) = name.rsplit_once('.').unwrap();
        let (millis, suffix) = stem.split_once('-').unwrap();

        assert_eq!(ext, "jpg");
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_persist_roundtrip_is_byte_identical() {
        let dir = tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path());
        let data_url = format!("data:image/png;base64,{}", PIXEL_PNG);

        let filename = store.persist(&data_url).await.unwrap();
        assert!(filename.ends_with(".png"));

        let expected = EmbeddedImage::parse(&data_url).unwrap().data;
        let stored = std::fs::read(store.path_of(&filename)).unwrap();
        assert_eq!(Bytes::from(stored), expected);
    }

    #[tokio::test]
    async fn test_malformed_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path());

        for bad in [
            "data:image/gif;base64,R0lGODlh",
            "data:image/png;base64,@@@",
            "image/png;base64,iVBORw0KGgo=",
        ] {
            let err = store.persist(bad).await.unwrap_err();
            assert!(matches!(err, RelayError::InvalidInput(_)));
        }

        assert_eq!(dir_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_storage_error() {
        let dir = tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path().join("missing").join("nested"));

        let err = store
            .persist(&format!("data:image/png;base64,{}", PIXEL_PNG))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_init_creates_directory() {
        let dir = tempdir().unwrap();
        let store = ScreenshotStore::new(dir.path().join("uploads"));

        store.init().await.unwrap();
        assert!(store.dir().is_dir());

        let filename = store
            .persist("data:image/jpeg;base64,/9j/4A==")
            .await
            .unwrap();
        assert!(filename.ends_with(".jpg"));
        assert_eq!(dir_entries(store.dir()), 1);
    }
}
