use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

/// File sink for product image uploads: one directory, generated filenames,
/// best-effort deletes. The image set manager talks to this without knowing
/// the storage medium.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `{product_id}-{millis}-{random}.{ext}`, unique enough to never
    /// overwrite a sibling upload.
    pub fn unique_filename(product_id: Uuid, original_name: &str) -> String {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let random = Uuid::new_v4().simple().to_string();
        format!(
            "{product_id}-{}-{}.{ext}",
            Utc::now().timestamp_millis(),
            &random[..8]
        )
    }

    /// Write the upload to disk, creating the directory on first use.
    /// Returns the relative path stored alongside the image record.
    pub async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating upload dir {}", self.root.display()))?;
        let filepath = self.root.join(filename);
        fs::write(&filepath, bytes)
            .await
            .with_context(|| format!("writing upload {}", filepath.display()))?;
        Ok(filepath.to_string_lossy().into_owned())
    }

    /// Delete the backing file for a removed image. A dangling file is
    /// preferable to a dangling database row, so failure is logged and
    /// swallowed here.
    pub async fn remove(&self, path: &str) {
        if let Err(err) = fs::remove_file(path).await {
            tracing::warn!(path, error = %err, "failed to delete image file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_filename_carries_product_id_and_extension() {
        let product_id = Uuid::new_v4();
        let name = UploadStore::unique_filename(product_id, "photo.JPG");
        assert!(name.starts_with(&product_id.to_string()));
        assert!(name.ends_with(".JPG"));
    }

    #[test]
    fn unique_filename_without_extension_falls_back() {
        let name = UploadStore::unique_filename(Uuid::new_v4(), "photo");
        assert!(name.ends_with(".bin"));
    }

    #[test]
    fn unique_filenames_differ_for_same_input() {
        let product_id = Uuid::new_v4();
        let a = UploadStore::unique_filename(product_id, "a.png");
        let b = UploadStore::unique_filename(product_id, "a.png");
        assert_ne!(a, b);
    }
}
