use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{Generator, GeneratorError};
use crate::models::{Analysis, CoursePlan, Syllabus};
use crate::pipeline::{CoursePlanRequest, ObjectiveMap, ObjectivesRequest, SyllabusRequest};
use crate::upload::MaterialRef;

/// Generator returning scripted responses after an optional delay.
///
/// Calls without a scripted response fail as malformed.
#[derive(Default)]
pub struct MockGenerator {
    analysis: Option<Result<Analysis, GeneratorError>>,
    objectives: Option<Result<ObjectiveMap, GeneratorError>>,
    syllabus: Option<Result<Syllabus, GeneratorError>>,
    course_plan: Option<Result<CoursePlan, GeneratorError>>,
    latency: Duration,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = Some(Ok(analysis));
        self
    }

    pub fn with_objectives(mut self, objectives: ObjectiveMap) -> Self {
        self.objectives = Some(Ok(objectives));
        self
    }

    pub fn with_syllabus(mut self, syllabus: Syllabus) -> Self {
        self.syllabus = Some(Ok(syllabus));
        self
    }

    pub fn with_course_plan(mut self, plan: CoursePlan) -> Self {
        self.course_plan = Some(Ok(plan));
        self
    }

    /// Make the syllabus call fail with `error`.
    pub fn failing_syllabus(mut self, error: GeneratorError) -> Self {
        self.syllabus = Some(Err(error));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond<T: Clone>(
        &self,
        scripted: &Option<Result<T, GeneratorError>>,
        what: &str,
    ) -> Result<T, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        scripted
            .clone()
            .unwrap_or_else(|| Err(GeneratorError::Malformed(format!("no scripted {what}"))))
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn analyze_material(&self, _material: &MaterialRef) -> Result<Analysis, GeneratorError> {
        self.respond(&self.analysis, "analysis").await
    }

    async fn learning_objectives(
        &self,
        _request: &ObjectivesRequest,
    ) -> Result<ObjectiveMap, GeneratorError> {
        self.respond(&self.objectives, "objectives").await
    }

    async fn generate_syllabus(&self, _request: &SyllabusRequest) -> Result<Syllabus, GeneratorError> {
        self.respond(&self.syllabus, "syllabus").await
    }

    async fn generate_course_plan(
        &self,
        _request: &CoursePlanRequest,
    ) -> Result<CoursePlan, GeneratorError> {
        self.respond(&self.course_plan, "course plan").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TopicEntry;

    #[tokio::test]
    async fn scripted_analysis_returned() {
        let generator =
            MockGenerator::new().with_analysis(Analysis::new("English", vec![TopicEntry::new("A", "")]));
        let analysis = generator
            .analyze_material(&MaterialRef::Text("x".into()))
            .await
            .unwrap();
        assert_eq!(analysis.language, "English");
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn unscripted_call_is_malformed() {
        let generator = MockGenerator::new();
        let err = generator
            .generate_course_plan(&CoursePlanRequest {
                analysis: Analysis::new("English", vec![]),
                syllabus: Syllabus::default(),
                number_of_lessons: 1,
                lesson_duration_minutes: 1,
            })
            .await
            .unwrap_err();
        assert!(err.is_malformed());
    }
}
