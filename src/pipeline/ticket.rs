//! One outstanding generator request.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::transform::{CoursePlanRequest, ObjectiveMap, ObjectivesRequest, SyllabusRequest};
use crate::generator::{Generator, GeneratorError};
use crate::models::{Analysis, CoursePlan, Stage, Syllabus};
use crate::upload::MaterialRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Analysis(MaterialRef),
    Objectives(ObjectivesRequest),
    Syllabus(SyllabusRequest),
    CoursePlan(CoursePlanRequest),
}

impl GenerationRequest {
    /// Stage that issues this request and receives its result.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Analysis(_) => Stage::Source,
            Self::Objectives(_) => Stage::Pedagogical,
            Self::Syllabus(_) => Stage::Syllabus,
            Self::CoursePlan(_) => Stage::CoursePlan,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Analysis(_) => "analysis",
            Self::Objectives(_) => "learning objectives",
            Self::Syllabus(_) => "syllabus",
            Self::CoursePlan(_) => "course plan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    Analysis(Analysis),
    Objectives(ObjectiveMap),
    Syllabus(Syllabus),
    CoursePlan(CoursePlan),
}

/// Handle for a request issued by the controller.
///
/// Carries the navigation epoch it was issued in; the controller drops the
/// result if the epoch moved on before it arrived.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    pub id: Uuid,
    pub stage: Stage,
    pub epoch: u64,
    pub request: GenerationRequest,
    cancel: CancellationToken,
}

impl GenerationTicket {
    pub(crate) fn new(request: GenerationRequest, epoch: u64, cancel: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: request.stage(),
            epoch,
            request,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run the request against `generator`, bounded by `timeout` and by the
    /// ticket's cancellation token.
    pub async fn execute<G>(&self, generator: &G, timeout: Duration) -> Result<Generated, GeneratorError>
    where
        G: Generator + ?Sized,
    {
        let call = async {
            match &self.request {
                GenerationRequest::Analysis(material) => generator
                    .analyze_material(material)
                    .await
                    .map(Generated::Analysis),
                GenerationRequest::Objectives(request) => generator
                    .learning_objectives(request)
                    .await
                    .map(Generated::Objectives),
                GenerationRequest::Syllabus(request) => generator
                    .generate_syllabus(request)
                    .await
                    .map(Generated::Syllabus),
                GenerationRequest::CoursePlan(request) => generator
                    .generate_course_plan(request)
                    .await
                    .map(Generated::CoursePlan),
            }
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(GeneratorError::Cancelled),
            outcome = tokio::time::timeout(timeout, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(GeneratorError::Timeout(timeout.as_secs())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockGenerator;
    use crate::models::TopicEntry;

    fn analysis_ticket() -> (GenerationTicket, CancellationToken) {
        let token = CancellationToken::new();
        let ticket = GenerationTicket::new(
            GenerationRequest::Analysis(MaterialRef::Text("cells".into())),
            0,
            token.clone(),
        );
        (ticket, token)
    }

    fn mock() -> MockGenerator {
        MockGenerator::new().with_analysis(Analysis::new("English", vec![TopicEntry::new("A", "")]))
    }

    #[tokio::test]
    async fn execute_returns_generated() {
        let (ticket, _) = analysis_ticket();
        assert_eq!(ticket.stage, Stage::Source);
        let generated = ticket.execute(&mock(), Duration::from_secs(5)).await.unwrap();
        assert!(matches!(generated, Generated::Analysis(_)));
    }

    #[tokio::test]
    async fn cancelled_ticket_stops_waiting() {
        let (ticket, token) = analysis_ticket();
        let generator = mock().with_latency(Duration::from_secs(30));
        token.cancel();
        let err = ticket
            .execute(&generator, Duration::from_secs(60))
            .await
            .unwrap_err();
        assert_eq!(err, GeneratorError::Cancelled);
        assert!(ticket.is_cancelled());
    }

    #[tokio::test]
    async fn slow_generator_times_out() {
        let (ticket, _) = analysis_ticket();
        let generator = mock().with_latency(Duration::from_secs(30));
        let err = ticket
            .execute(&generator, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, GeneratorError::Timeout(0));
    }
}
