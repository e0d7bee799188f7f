//! Generated documents: the syllabus and the course plan.
//!
//! Both serialize with the backend's PascalCase keys. Those keys are also the
//! segment names used by [`crate::editor::FieldPath`] to address a field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::analysis::TopicEntry;
use super::stage::Stage;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Syllabus {
    #[serde(alias = "courseTitle", default)]
    pub course_title: String,
    #[serde(alias = "courseDescription", default)]
    pub course_description: String,
    #[serde(alias = "learningOutcomes", default)]
    pub learning_outcomes: Vec<String>,
    #[serde(alias = "courseGoals", default)]
    pub course_goals: Vec<String>,
    #[serde(alias = "courseTopics", default)]
    pub course_topics: Vec<TopicEntry>,
    #[serde(alias = "prerequisites", default)]
    pub prerequisites: Vec<String>,
}

impl Syllabus {
    pub fn is_empty(&self) -> bool {
        self.course_title.trim().is_empty()
            && self.course_description.trim().is_empty()
            && self.learning_outcomes.is_empty()
            && self.course_goals.is_empty()
            && self.course_topics.is_empty()
            && self.prerequisites.is_empty()
    }
}

/// One lecture of a course plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Lecture {
    #[serde(alias = "title", default)]
    pub title: String,
    #[serde(alias = "topics", default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoursePlan {
    #[serde(alias = "plan", default)]
    pub plan: Vec<Lecture>,
}

impl CoursePlan {
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// Document: tagged union over editable documents
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Syllabus,
    CoursePlan,
}

impl DocumentKind {
    /// Stage whose artifact this kind of document is.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Syllabus => Stage::Syllabus,
            Self::CoursePlan => Stage::CoursePlan,
        }
    }

    pub fn for_stage(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Syllabus => Some(Self::Syllabus),
            Stage::CoursePlan => Some(Self::CoursePlan),
            _ => None,
        }
    }

    /// Build a new array element for `array_field` from the text the user typed.
    ///
    /// Returns the element and the name of the key field that holds the text
    /// (`None` for plain string arrays).
    pub fn new_element(&self, array_field: &str, text: &str) -> Option<(Value, Option<&'static str>)> {
        match (self, array_field) {
            (Self::Syllabus, "LearningOutcomes" | "CourseGoals" | "Prerequisites") => {
                Some((Value::String(text.to_string()), None))
            }
            (Self::Syllabus, "CourseTopics") => Some((
                serde_json::json!({ "Topic": text, "Description": "" }),
                Some("Topic"),
            )),
            (Self::CoursePlan, "Plan") => Some((
                serde_json::json!({ "Title": text, "Topics": [] }),
                Some("Title"),
            )),
            (Self::CoursePlan, "Topics") => Some((Value::String(text.to_string()), None)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "document", rename_all = "snake_case")]
pub enum Document {
    Syllabus(Syllabus),
    CoursePlan(CoursePlan),
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Syllabus(_) => DocumentKind::Syllabus,
            Self::CoursePlan(_) => DocumentKind::CoursePlan,
        }
    }

    pub fn stage(&self) -> Stage {
        self.kind().stage()
    }

    /// Untagged JSON body, keyed as the backend keys it.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Syllabus(s) => serde_json::to_value(s),
            Self::CoursePlan(p) => serde_json::to_value(p),
        }
    }

    pub fn from_value(kind: DocumentKind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            DocumentKind::Syllabus => Self::Syllabus(serde_json::from_value(value)?),
            DocumentKind::CoursePlan => Self::CoursePlan(serde_json::from_value(value)?),
        })
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Syllabus(s) => s.is_empty(),
            Self::CoursePlan(p) => p.is_empty(),
        }
    }
}
