pub mod controller;
pub mod events;
pub mod session;
pub mod store;
pub mod ticket;
pub mod transform;

pub use controller::*;
pub use events::*;
pub use session::*;
pub use store::*;
pub use ticket::*;
pub use transform::*;

use thiserror::Error;

use crate::editor::{EditorError, FieldPath};
use crate::export::ExportError;
use crate::models::Stage;
use crate::upload::UploadError;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Cannot act on stage {stage} while the workflow is at {current}")]
    InvalidTransition { stage: Stage, current: Stage },

    #[error("Nothing selected: {0}")]
    EmptySelection(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Generated content could not be read: {0}")]
    MalformedArtifact(String),

    #[error("No artifact stored for stage {0}")]
    MissingArtifact(Stage),

    #[error("Artifact does not belong to stage {0}")]
    ArtifactMismatch(Stage),

    #[error("No document is open for editing")]
    NoOpenDocument,

    #[error("The {0} document changed since it was opened")]
    StaleWorkingCopy(Stage),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Workflow state lock poisoned")]
    LockPoisoned,

    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

impl WorkflowError {
    pub fn edit_in_progress(active: &FieldPath) -> Self {
        Self::Editor(EditorError::EditInProgress {
            active: active.clone(),
        })
    }

    pub fn is_edit_in_progress(&self) -> bool {
        matches!(self, Self::Editor(EditorError::EditInProgress { .. }))
    }
}
