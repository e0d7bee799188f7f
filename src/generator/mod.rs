//! Client side of the external generation service.

pub mod decode;
pub mod http;
pub mod mock;

pub use decode::*;
pub use http::*;
pub use mock::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Analysis, CoursePlan, Syllabus};
use crate::pipeline::{CoursePlanRequest, ObjectiveMap, ObjectivesRequest, SyllabusRequest};
use crate::upload::MaterialRef;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Cannot reach generation service at {0}")]
    Connection(String),

    #[error("Generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Request cancelled")]
    Cancelled,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl GeneratorError {
    /// The service answered, but not with a readable artifact.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Request/response service returning generated artifacts.
///
/// Calls are never retried by the client.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn analyze_material(&self, material: &MaterialRef) -> Result<Analysis, GeneratorError>;

    async fn learning_objectives(
        &self,
        request: &ObjectivesRequest,
    ) -> Result<ObjectiveMap, GeneratorError>;

    async fn generate_syllabus(&self, request: &SyllabusRequest) -> Result<Syllabus, GeneratorError>;

    async fn generate_course_plan(
        &self,
        request: &CoursePlanRequest,
    ) -> Result<CoursePlan, GeneratorError>;
}
