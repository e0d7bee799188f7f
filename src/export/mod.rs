//! Paginated reports of finished documents.

pub mod layout;
pub mod pdf;

pub use layout::*;
pub use pdf::*;

use thiserror::Error;

use crate::models::Document;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Logo could not be used: {0}")]
    Logo(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document has no content to export")]
    EmptyDocument,

    #[error("Export task failed: {0}")]
    Task(String),
}

/// Serializes a finished document to a report.
pub trait Exporter: Send + Sync {
    fn export(&self, document: &Document) -> Result<Vec<u8>, ExportError>;

    fn file_name(&self, document: &Document) -> String {
        format!("{}.pdf", document.stage())
    }
}
