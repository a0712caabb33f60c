//! Image store for listing covers.
//!
//! Images live on local disk under a configurable root and are served by the
//! router at `/images`. Keys are UUIDs so concurrent uploads of files with
//! the same name cannot collide.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::domain::ServiceError;

/// Served for listings created without an image.
pub const PLACEHOLDER_IMAGE_URL: &str = "/images/book-placeholder.png";

#[derive(Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store image bytes under a fresh UUID key, keeping the original file
    /// extension. Returns the public URL for the stored object.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let key = format!("{}.{}", Uuid::new_v4(), ext);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ServiceError::Upload(e.to_string()))?;
        tokio::fs::write(self.root.join(&key), bytes)
            .await
            .map_err(|e| ServiceError::Upload(e.to_string()))?;

        Ok(format!("/images/{}", key))
    }

    /// Delete the object behind a URL previously returned by [`save`].
    /// The shared placeholder and foreign URLs are left alone.
    ///
    /// [`save`]: ImageStore::save
    pub async fn delete(&self, image_url: &str) -> std::io::Result<()> {
        if image_url == PLACEHOLDER_IMAGE_URL {
            return Ok(());
        }
        let Some(key) = image_url.strip_prefix("/images/") else {
            return Ok(());
        };
        // Refuse anything that is not a bare filename.
        if Path::new(key).file_name() != Some(std::ffi::OsStr::new(key)) {
            return Ok(());
        }

        tokio::fs::remove_file(self.root.join(key)).await
    }
}
