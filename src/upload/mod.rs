pub mod format;
pub mod storage;

pub use format::*;
pub use storage::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Invalid material URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Material text is empty")]
    EmptyText,

    #[error("No stored material with handle {0}")]
    UnknownHandle(String),
}

/// What the analysis request points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MaterialRef {
    /// A web page or document reachable over http(s).
    Url(String),
    /// Opaque handle returned by [`MaterialStorage::store`].
    Stored(String),
    /// Pasted text.
    Text(String),
}

impl MaterialRef {
    pub fn url(raw: &str) -> Result<Self, UploadError> {
        let raw = raw.trim();
        let parsed = reqwest::Url::parse(raw).map_err(|e| UploadError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UploadError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        Ok(Self::Url(parsed.to_string()))
    }

    pub fn text(body: &str) -> Result<Self, UploadError> {
        if body.trim().is_empty() {
            return Err(UploadError::EmptyText);
        }
        Ok(Self::Text(body.to_string()))
    }

    pub fn stored(material: &StoredMaterial) -> Self {
        Self::Stored(material.handle.clone())
    }

    /// The string sent to the analysis endpoint as `material`.
    pub fn as_material(&self) -> &str {
        match self {
            Self::Url(s) | Self::Stored(s) | Self::Text(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_requires_http_scheme() {
        assert!(matches!(
            MaterialRef::url("https://example.org/notes.pdf"),
            Ok(MaterialRef::Url(_))
        ));
        assert!(matches!(
            MaterialRef::url("ftp://example.org/notes.pdf"),
            Err(UploadError::InvalidUrl { .. })
        ));
        assert!(matches!(
            MaterialRef::url("not a url"),
            Err(UploadError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn blank_text_rejected() {
        assert!(matches!(MaterialRef::text("  \n"), Err(UploadError::EmptyText)));
        assert_eq!(
            MaterialRef::text("Photosynthesis").unwrap().as_material(),
            "Photosynthesis"
        );
    }

    #[test]
    fn serializes_tagged() {
        let json = serde_json::to_string(&MaterialRef::Stored("abc".into())).unwrap();
        assert_eq!(json, r#"{"type":"stored","value":"abc"}"#);
    }
}
