//! Store photo uploads.
//!
//! Photos are written to the upload directory under a random UUID filename
//! whose extension is taken from the declared MIME subtype. Nothing is
//! resized or re-encoded.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use thiserror::Error;
use uuid::Uuid;

/// Errors from saving an uploaded photo.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The declared content type is not `image/*`.
    #[error("that filetype isn't allowed")]
    NotAnImage(String),

    /// The photo exceeds the configured limit.
    #[error("photo must be at most {max} bytes")]
    TooLarge { max: usize },

    /// Writing the file failed.
    #[error("could not store photo: {0}")]
    Io(#[from] std::io::Error),
}

/// A photo received in a form, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Declared MIME type of the part.
    pub content_type: String,
    pub bytes: Bytes,
}

/// Directory-backed photo storage.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl PhotoStore {
    #[must_use]
    pub const fn new(dir: PathBuf, max_bytes: usize) -> Self {
        Self { dir, max_bytes }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it is missing.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` if the directory cannot be created.
    pub async fn ensure_dir(&self) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Store `bytes` and return the new filename.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::NotAnImage` unless `content_type` starts with
    /// `image/`, `UploadError::TooLarge` past the size limit, and
    /// `UploadError::Io` if the write fails.
    pub async fn save(&self, content_type: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let extension = image_extension(content_type)
            .ok_or_else(|| UploadError::NotAnImage(content_type.to_string()))?;
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                max: self.max_bytes,
            });
        }

        let filename = format!("{}.{extension}", Uuid::new_v4());
        tokio::fs::write(self.dir.join(&filename), bytes).await?;

        tracing::debug!(filename = %filename, size = bytes.len(), "Photo stored");
        Ok(filename)
    }

    /// Delete a stored photo. A file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` if the file exists but cannot be removed.
    pub async fn remove(&self, filename: &str) -> Result<(), UploadError> {
        match tokio::fs::remove_file(self.dir.join(filename)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// File extension for an `image/*` content type: the subtype up to any
/// suffix or parameter (`image/svg+xml` -> `svg`).
fn image_extension(content_type: &str) -> Option<String> {
    let subtype = content_type.trim().to_ascii_lowercase();
    let subtype = subtype.strip_prefix("image/")?;
    let extension: String = subtype
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    (!extension.is_empty()).then_some(extension)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_store(max_bytes: usize) -> PhotoStore {
        let dir = std::env::temp_dir().join(format!("delicious-uploads-{}", Uuid::new_v4()));
        PhotoStore::new(dir, max_bytes)
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/jpeg").as_deref(), Some("jpeg"));
        assert_eq!(image_extension("IMAGE/PNG").as_deref(), Some("png"));
        assert_eq!(image_extension("image/svg+xml").as_deref(), Some("svg"));
        assert_eq!(image_extension("image/webp; q=1").as_deref(), Some("webp"));
        assert_eq!(image_extension("image/"), None);
        assert_eq!(image_extension("text/plain"), None);
        assert_eq!(image_extension("application/x-image/png"), None);
    }

    #[tokio::test]
    async fn test_save_writes_uuid_named_file() {
        let store = temp_store(1024);
        store.ensure_dir().await.unwrap();

        let filename = store.save("image/png", b"\x89PNG").await.unwrap();
        let (stem, ext) = filename.rsplit_once('.').unwrap();
        assert_eq!(ext, "png");
        assert!(Uuid::parse_str(stem).is_ok());

        let written = tokio::fs::read(store.dir().join(&filename)).await.unwrap();
        assert_eq!(written, b"\x89PNG");

        tokio::fs::remove_dir_all(store.dir()).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_rejects_non_images() {
        let store = temp_store(1024);
        let err = store.save("application/pdf", b"%PDF").await.unwrap_err();
        assert!(matches!(err, UploadError::NotAnImage(_)));
        assert_eq!(err.to_string(), "that filetype isn't allowed");
    }

    #[tokio::test]
    async fn test_save_rejects_oversized() {
        let store = temp_store(2);
        let err = store.save("image/gif", b"GIF89a").await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { max: 2 }));
    }

    #[tokio::test]
    async fn test_remove_deletes_file_and_ignores_missing() {
        let store = temp_store(1024);
        store.ensure_dir().await.unwrap();

        let filename = store.save("image/jpeg", b"jpeg").await.unwrap();
        store.remove(&filename).await.unwrap();
        assert!(!store.dir().join(&filename).exists());
        store.remove(&filename).await.unwrap();

        tokio::fs::remove_dir_all(store.dir()).await.unwrap();
    }
}
