use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Local file store for product images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the bytes under a fresh name that keeps the original extension and
    /// returns the stored reference (`<root>/<uuid>.<ext>`).
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(AppError::Validation("Image file is empty".into()));
        }
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let file_name = stored_file_name(original_name);
        let path = self.root.join(&file_name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "image stored");
        Ok(path.to_string_lossy().into_owned())
    }

    /// Removes a stored image whose product row was never written.
    pub async fn discard(&self, reference: &str) {
        let path = Path::new(reference);
        if !path.starts_with(&self.root) {
            tracing::warn!(reference, "refusing to discard an image outside the store");
            return;
        }
        if let Err(err) = fs::remove_file(path).await {
            tracing::warn!(reference, error = %err, "failed to discard image");
        }
    }
}

fn stored_file_name(original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());
    match ext {
        Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
        None => Uuid::new_v4().to_string(),
    }
}
