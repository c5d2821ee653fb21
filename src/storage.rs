//! Evidence file storage on the local filesystem
//!
//! Files live under the media root as `evidence/<company_id>/<uuid>_<name>`.
//! Evidence rows store only that relative reference.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::security::{sanitize_file_name, validate_file_path};

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` for `company_id` and return the relative reference to store
    pub async fn save(&self, company_id: i64, file_name: &str, bytes: &[u8]) -> Result<String> {
        let safe_name = sanitize_file_name(file_name)?;
        let relative = format!(
            "evidence/{}/{}_{}",
            company_id,
            uuid::Uuid::new_v4().simple(),
            safe_name
        );

        let full_path = self.root.join(&relative);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create media directory: {:?}", parent))?;
        }

        tokio::fs::write(&full_path, bytes)
            .await
            .context(format!("Failed to write evidence file: {:?}", full_path))?;

        Ok(relative)
    }

    /// Read the file behind a stored reference
    pub async fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let path = validate_file_path(&self.root, relative)?;

        tokio::fs::read(&path)
            .await
            .context(format!("Failed to read evidence file: {}", relative))
    }

    /// Delete the file behind a stored reference
    pub async fn remove(&self, relative: &str) -> Result<()> {
        let path = validate_file_path(&self.root, relative)?;

        tokio::fs::remove_file(&path)
            .await
            .context(format!("Failed to remove evidence file: {}", relative))
    }
}
