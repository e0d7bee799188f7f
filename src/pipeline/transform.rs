//! Pure rules that turn stored artifacts into the next generation request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::WorkflowError;
use crate::models::{
    Analysis, BloomLevel, ContextSelection, PedagogicalSelection, SelectionList, Syllabus,
};

/// Language whose analyses list the translated topics in the second half.
pub const ITALIAN_LANGUAGE: &str = "Italian";

/// Objectives grouped by gerund level name (`Remembering`, `Applying`, ...).
pub type ObjectiveMap = BTreeMap<String, Vec<String>>;

/// Zero-based canonical index of the highest selected Bloom level.
pub fn resolve_bloom_level(levels: &[BloomLevel]) -> Result<usize, WorkflowError> {
    levels
        .iter()
        .map(BloomLevel::index)
        .max()
        .ok_or_else(|| WorkflowError::EmptySelection("Bloom levels".into()))
}

/// Topics to offer for selection.
///
/// The analysis service lists each topic twice, once per language, with the
/// Italian rendering in the second half. The split is at `len / 2`; an odd
/// middle element goes to the second half.
// TODO: replace the halving rule once the analysis response tags each topic with its language.
pub fn filter_topics_by_language<'a, T>(topics: &'a [T], language: &str) -> &'a [T] {
    let mid = topics.len() / 2;
    if language == ITALIAN_LANGUAGE {
        &topics[mid..]
    } else {
        &topics[..mid]
    }
}

// ═══════════════════════════════════════════════════════════
// Request payloads
// ═══════════════════════════════════════════════════════════

/// Body of `POST /generateSyllabus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusRequest {
    /// The analysis without its internal prompt.
    #[serde(rename = "Analysis")]
    pub analysis: Analysis,
    #[serde(rename = "bloomLevel")]
    pub bloom_level: usize,
    #[serde(rename = "Context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextSelection>,
    #[serde(
        rename = "LearningObjectives",
        default,
        skip_serializing_if = "SelectionList::is_empty"
    )]
    pub learning_objectives: SelectionList,
}

impl SyllabusRequest {
    pub fn with_context(mut self, context: &ContextSelection) -> Self {
        self.context = Some(context.clone());
        self
    }

    pub fn with_objectives(mut self, objectives: &SelectionList) -> Self {
        self.learning_objectives = objectives.clone();
        self
    }
}

/// Drop the analysis prompt and attach the Bloom index.
pub fn build_generation_request(analysis: &Analysis, bloom_level: usize) -> SyllabusRequest {
    SyllabusRequest {
        analysis: Analysis {
            prompt: None,
            ..analysis.clone()
        },
        bloom_level,
        context: None,
        learning_objectives: SelectionList::new(),
    }
}

/// Full syllabus request from the three upstream artifacts.
pub fn build_syllabus_request(
    analysis: &Analysis,
    context: &ContextSelection,
    pedagogy: &PedagogicalSelection,
) -> Result<SyllabusRequest, WorkflowError> {
    let bloom_level = resolve_bloom_level(pedagogy.bloom_levels.levels())?;
    Ok(build_generation_request(analysis, bloom_level)
        .with_context(context)
        .with_objectives(&pedagogy.objectives))
}

/// Size of the course to plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursePlanParams {
    pub number_of_lessons: u32,
    pub lesson_duration_minutes: u32,
}

impl CoursePlanParams {
    pub fn new(number_of_lessons: u32, lesson_duration_minutes: u32) -> Result<Self, WorkflowError> {
        if number_of_lessons == 0 {
            return Err(WorkflowError::InvalidParameters(
                "number of lessons must be positive".into(),
            ));
        }
        if lesson_duration_minutes == 0 {
            return Err(WorkflowError::InvalidParameters(
                "lesson duration must be positive".into(),
            ));
        }
        Ok(Self {
            number_of_lessons,
            lesson_duration_minutes,
        })
    }
}

/// Body of `POST /generateCoursePlan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursePlanRequest {
    #[serde(rename = "Analysis")]
    pub analysis: Analysis,
    #[serde(rename = "Syllabus")]
    pub syllabus: Syllabus,
    #[serde(rename = "numberOfLessons")]
    pub number_of_lessons: u32,
    #[serde(rename = "lessonDuration")]
    pub lesson_duration_minutes: u32,
}

pub fn build_course_plan_request(
    analysis: &Analysis,
    syllabus: &Syllabus,
    params: CoursePlanParams,
) -> CoursePlanRequest {
    CoursePlanRequest {
        analysis: Analysis {
            prompt: None,
            ..analysis.clone()
        },
        syllabus: syllabus.clone(),
        number_of_lessons: params.number_of_lessons,
        lesson_duration_minutes: params.lesson_duration_minutes,
    }
}

/// Body of `POST /getLearningObjectives`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectivesRequest {
    pub topic: String,
    pub context: String,
    pub level: usize,
}

pub fn build_objectives_request(
    context: &ContextSelection,
    levels: &[BloomLevel],
) -> Result<ObjectivesRequest, WorkflowError> {
    if context.selected_topics.is_empty() {
        return Err(WorkflowError::EmptySelection("topics".into()));
    }
    let level = resolve_bloom_level(levels)?;
    Ok(ObjectivesRequest {
        topic: context.selected_topics.iter().collect::<Vec<_>>().join(", "),
        context: context
            .class_level
            .map(|c| c.label().to_string())
            .unwrap_or_default(),
        level,
    })
}

/// Concatenate the objectives of `levels` in canonical order.
pub fn collect_objectives(map: &ObjectiveMap, levels: &[BloomLevel]) -> Vec<String> {
    let mut ordered = levels.to_vec();
    ordered.sort();
    ordered.dedup();
    ordered
        .iter()
        .filter_map(|level| map.get(level.objective_key()))
        .flatten()
        .cloned()
        .collect()
}
