use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::format::{detect_format, sanitize_filename, MaterialCategory};
use super::UploadError;

/// A file accepted by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMaterial {
    /// Opaque handle usable as the analysis `material`.
    pub handle: String,
    pub original_name: String,
    pub path: PathBuf,
    pub category: MaterialCategory,
    pub size_bytes: u64,
    /// SHA-256 of the content, base64.
    pub content_hash: String,
}

/// Accepts uploaded material and hands back a handle.
pub trait MaterialStorage: Send + Sync {
    fn store(&self, source: &Path) -> Result<StoredMaterial, UploadError>;

    fn locate(&self, handle: &str) -> Result<PathBuf, UploadError>;

    fn remove(&self, handle: &str) -> Result<(), UploadError>;
}

/// Keeps uploads in a local directory as `<uuid>.<ext>`.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage rooted at [`crate::config::uploads_dir`].
    pub fn default_location() -> Self {
        Self::new(crate::config::uploads_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find(&self, handle: &str) -> Result<Option<PathBuf>, UploadError> {
        if Uuid::parse_str(handle).is_err() || !self.root.exists() {
            return Ok(None);
        }
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(handle) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

impl MaterialStorage for LocalStorage {
    fn store(&self, source: &Path) -> Result<StoredMaterial, UploadError> {
        let format = detect_format(source)?;
        if !format.category.is_supported() {
            return Err(UploadError::UnsupportedFormat(format.mime_type));
        }

        std::fs::create_dir_all(&self.root)?;
        let handle = Uuid::new_v4().to_string();
        let target = self
            .root
            .join(format!("{handle}.{}", format.category.extension()));

        let content = std::fs::read(source)?;
        std::fs::write(&target, &content)?;

        let original_name = sanitize_filename(&source.to_string_lossy());
        tracing::debug!(
            handle = %handle,
            category = format.category.as_str(),
            size = content.len(),
            "Material stored"
        );

        Ok(StoredMaterial {
            handle,
            original_name,
            path: target,
            category: format.category,
            size_bytes: format.file_size_bytes,
            content_hash: content_hash(&content),
        })
    }

    fn locate(&self, handle: &str) -> Result<PathBuf, UploadError> {
        self.find(handle)?
            .ok_or_else(|| UploadError::UnknownHandle(handle.to_string()))
    }

    fn remove(&self, handle: &str) -> Result<(), UploadError> {
        if let Some(path) = self.find(handle)? {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// SHA-256 of `content`, base64-encoded.
pub fn content_hash(content: &[u8]) -> String {
    let hash = Sha256::digest(content);
    base64::engine::general_purpose::STANDARD.encode(hash)
}
