//! Field-by-field editing of generated documents.
//!
//! The editor keeps two JSON trees for the open document: the last committed
//! state and a working copy. At most one field is in edit mode at a time, so
//! the two trees only ever differ at the active path.

pub mod path;

pub use path::{FieldPath, PathSegment};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{Document, DocumentKind, Stage};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("Field {active} is being edited; commit or cancel it first")]
    EditInProgress { active: FieldPath },

    #[error("Field {0} is not in edit mode")]
    NotEditing(FieldPath),

    #[error("Invalid field path: {0}")]
    InvalidPath(String),

    #[error("Field {0} is not a text field")]
    NotText(FieldPath),

    #[error("{0} is not an array that accepts new entries")]
    NotAppendable(FieldPath),

    #[error("Document could not be converted: {0}")]
    Conversion(String),
}

/// Which artifact a working copy belongs to. A revision changes whenever the
/// store receives a newly generated artifact for the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactIdentity {
    pub stage: Stage,
    pub revision: u64,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedField {
    pub path: FieldPath,
    /// False when the committed value equals the previous one.
    pub changed: bool,
}

/// A single editable text field, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditableField {
    pub path: FieldPath,
    pub label: String,
    pub value: String,
    pub multiline: bool,
}

pub struct DocumentEditor {
    identity: ArtifactIdentity,
    kind: DocumentKind,
    committed: Value,
    working: Value,
    active: Option<FieldPath>,
}

impl DocumentEditor {
    pub fn open(identity: ArtifactIdentity, document: &Document) -> Result<Self, EditorError> {
        let value = document
            .to_value()
            .map_err(|e| EditorError::Conversion(e.to_string()))?;
        Ok(Self {
            identity,
            kind: document.kind(),
            committed: value.clone(),
            working: value,
            active: None,
        })
    }

    pub fn identity(&self) -> ArtifactIdentity {
        self.identity
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// The field currently in edit mode, if any.
    pub fn active(&self) -> Option<&FieldPath> {
        self.active.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.active.is_some()
    }

    /// Current working value of a text field.
    pub fn value(&self, path: &FieldPath) -> Option<&str> {
        path.resolve(&self.working).and_then(Value::as_str)
    }

    /// Last committed value of a text field.
    pub fn committed_value(&self, path: &FieldPath) -> Option<&str> {
        path.resolve(&self.committed).and_then(Value::as_str)
    }

    pub fn begin_edit(&mut self, path: FieldPath) -> Result<(), EditorError> {
        match &self.active {
            Some(active) if *active == path => return Ok(()),
            Some(active) => {
                return Err(EditorError::EditInProgress {
                    active: active.clone(),
                })
            }
            None => {}
        }
        self.text_at(&path)?;
        tracing::debug!(path = %path, "Edit started");
        self.active = Some(path);
        Ok(())
    }

    pub fn set_value(&mut self, path: &FieldPath, value: impl Into<String>) -> Result<(), EditorError> {
        self.ensure_active(path)?;
        let slot = path
            .resolve_mut(&mut self.working)
            .ok_or_else(|| EditorError::InvalidPath(path.to_string()))?;
        *slot = Value::String(value.into());
        Ok(())
    }

    /// Save the working value of `path`. Committing when nothing is being
    /// edited is a no-op and returns `None`.
    pub fn commit(&mut self, path: &FieldPath) -> Result<Option<SavedField>, EditorError> {
        if self.active.is_none() {
            return Ok(None);
        }
        self.ensure_active(path)?;

        let working = self.text_at(path)?.to_string();
        let slot = path
            .resolve_mut(&mut self.committed)
            .ok_or_else(|| EditorError::InvalidPath(path.to_string()))?;
        let changed = slot.as_str() != Some(working.as_str());
        *slot = Value::String(working);
        self.active = None;

        tracing::debug!(path = %path, changed, "Field saved");
        Ok(Some(SavedField {
            path: path.clone(),
            changed,
        }))
    }

    /// Drop the in-progress value of `path`. No-op when nothing is being edited.
    pub fn cancel(&mut self, path: &FieldPath) -> Result<(), EditorError> {
        if self.active.is_none() {
            return Ok(());
        }
        self.ensure_active(path)?;

        let committed = path
            .resolve(&self.committed)
            .cloned()
            .ok_or_else(|| EditorError::InvalidPath(path.to_string()))?;
        if let Some(slot) = path.resolve_mut(&mut self.working) {
            *slot = committed;
        }
        self.active = None;
        Ok(())
    }

    /// Append a new entry built from `text` to the array at `array`.
    ///
    /// The entry is saved immediately and its text field becomes the active
    /// edit. Blank text and exact duplicates are ignored (`Ok(None)`).
    pub fn append(&mut self, array: &FieldPath, text: &str) -> Result<Option<FieldPath>, EditorError> {
        if let Some(active) = &self.active {
            return Err(EditorError::EditInProgress {
                active: active.clone(),
            });
        }
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let field = array
            .last_key()
            .ok_or_else(|| EditorError::InvalidPath(array.to_string()))?;
        let (element, key) = self
            .kind
            .new_element(field, text)
            .ok_or_else(|| EditorError::NotAppendable(array.clone()))?;

        let items = array
            .resolve(&self.committed)
            .and_then(Value::as_array)
            .ok_or_else(|| EditorError::NotAppendable(array.clone()))?;
        let duplicate = items.iter().any(|item| match key {
            Some(k) => item.get(k).and_then(Value::as_str) == Some(text),
            None => item.as_str() == Some(text),
        });
        if duplicate {
            return Ok(None);
        }
        let index = items.len();

        for tree in [&mut self.committed, &mut self.working] {
            if let Some(Value::Array(items)) = array.resolve_mut(tree) {
                items.push(element.clone());
            }
        }

        let mut new_path = array.clone().index(index);
        if let Some(k) = key {
            new_path = new_path.key(k);
        }
        tracing::debug!(path = %new_path, "Entry appended");
        self.active = Some(new_path.clone());
        Ok(Some(new_path))
    }

    pub fn committed_document(&self) -> Result<Document, EditorError> {
        Document::from_value(self.kind, self.committed.clone())
            .map_err(|e| EditorError::Conversion(e.to_string()))
    }

    pub fn working_document(&self) -> Result<Document, EditorError> {
        Document::from_value(self.kind, self.working.clone())
            .map_err(|e| EditorError::Conversion(e.to_string()))
    }

    /// Every text field of the working copy, in document order.
    pub fn fields(&self) -> Vec<EditableField> {
        let mut fields = Vec::new();
        if let Value::Object(map) = &self.working {
            for (key, value) in ordered_entries(map) {
                collect_fields(FieldPath::field(key), key, value, &mut fields);
            }
        }
        fields
    }

    fn ensure_active(&self, path: &FieldPath) -> Result<(), EditorError> {
        match &self.active {
            Some(active) if active == path => Ok(()),
            Some(active) => Err(EditorError::EditInProgress {
                active: active.clone(),
            }),
            None => Err(EditorError::NotEditing(path.clone())),
        }
    }

    fn text_at(&self, path: &FieldPath) -> Result<&str, EditorError> {
        match path.resolve(&self.working) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(EditorError::NotText(path.clone())),
            None => Err(EditorError::InvalidPath(path.to_string())),
        }
    }
}

fn collect_fields(path: FieldPath, label: &str, value: &Value, out: &mut Vec<EditableField>) {
    match value {
        Value::String(s) => out.push(EditableField {
            multiline: label.ends_with("Description") || path.segments().len() > 1,
            label: humanize(label),
            value: s.clone(),
            path,
        }),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_fields(path.clone().index(i), label, item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in ordered_entries(map) {
                collect_fields(path.clone().key(key), key, item, out);
            }
        }
        _ => {}
    }
}

/// Keys in the order the documents present them. Unknown keys sort last.
const FIELD_ORDER: &[&str] = &[
    "CourseTitle",
    "CourseDescription",
    "LearningOutcomes",
    "CourseGoals",
    "CourseTopics",
    "Prerequisites",
    "Plan",
    "Title",
    "Topic",
    "Description",
    "Topics",
];

fn ordered_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let rank = |key: &str| {
        FIELD_ORDER
            .iter()
            .position(|k| *k == key)
            .unwrap_or(FIELD_ORDER.len())
    };
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| rank(a.0).cmp(&rank(b.0)).then_with(|| a.0.cmp(b.0)));
    entries
}

/// `CourseTitle` -> `Course Title`
fn humanize(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CoursePlan, Lecture, Syllabus, TopicEntry};

    fn identity() -> ArtifactIdentity {
        ArtifactIdentity {
            stage: Stage::Syllabus,
            revision: 1,
        }
    }

    fn syllabus_editor() -> DocumentEditor {
        let syllabus = Syllabus {
            course_title: "Intro".into(),
            course_description: "Overview".into(),
            learning_outcomes: vec!["Define a cell".into(), "Name organelles".into()],
            course_goals: vec!["Curiosity".into()],
            course_topics: vec![TopicEntry::new("Cells", "Units of life")],
            prerequisites: vec![],
        };
        DocumentEditor::open(identity(), &Document::Syllabus(syllabus)).unwrap()
    }

    fn title() -> FieldPath {
        FieldPath::field("CourseTitle")
    }

    #[test]
    fn edit_title_then_commit() {
        let mut editor = syllabus_editor();
        editor.begin_edit(title()).unwrap();
        editor.set_value(&title(), "Intro to Biology").unwrap();
        let saved = editor.commit(&title()).unwrap().unwrap();
        assert!(saved.changed);
        assert!(editor.active().is_none());
        assert_eq!(editor.value(&title()), Some("Intro to Biology"));

        // A later cancel has nothing to revert.
        editor.cancel(&title()).unwrap();
        assert_eq!(editor.value(&title()), Some("Intro to Biology"));
        match editor.committed_document().unwrap() {
            Document::Syllabus(s) => assert_eq!(s.course_title, "Intro to Biology"),
            other => panic!("unexpected document {other:?}"),
        }
    }

    #[test]
    fn commit_twice_is_noop() {
        let mut editor = syllabus_editor();
        editor.begin_edit(title()).unwrap();
        let first = editor.commit(&title()).unwrap().unwrap();
        assert!(!first.changed);
        assert!(editor.commit(&title()).unwrap().is_none());
    }

    #[test]
    fn cancel_reverts_to_committed() {
        let mut editor = syllabus_editor();
        editor.begin_edit(title()).unwrap();
        editor.set_value(&title(), "Scratch").unwrap();
        assert_eq!(editor.value(&title()), Some("Scratch"));
        editor.cancel(&title()).unwrap();
        assert_eq!(editor.value(&title()), Some("Intro"));
        assert!(!editor.is_editing());
    }

    #[test]
    fn second_field_blocked_while_first_active() {
        let mut editor = syllabus_editor();
        editor.begin_edit(title()).unwrap();
        let other = FieldPath::field("CourseDescription");
        let err = editor.begin_edit(other.clone()).unwrap_err();
        assert_eq!(err, EditorError::EditInProgress { active: title() });
        assert!(matches!(
            editor.set_value(&other, "x"),
            Err(EditorError::EditInProgress { .. })
        ));
        assert!(matches!(editor.commit(&other), Err(EditorError::EditInProgress { .. })));
        // Re-entering the active field is allowed.
        editor.begin_edit(title()).unwrap();
    }

    #[test]
    fn set_value_requires_edit_mode() {
        let mut editor = syllabus_editor();
        assert_eq!(
            editor.set_value(&title(), "x"),
            Err(EditorError::NotEditing(title()))
        );
    }

    #[test]
    fn array_element_edit_leaves_siblings() {
        let mut editor = syllabus_editor();
        let second = FieldPath::element("LearningOutcomes", 1);
        editor.begin_edit(second.clone()).unwrap();
        editor.set_value(&second, "List organelles").unwrap();
        editor.commit(&second).unwrap();
        assert_eq!(editor.value(&FieldPath::element("LearningOutcomes", 0)), Some("Define a cell"));
        assert_eq!(editor.value(&second), Some("List organelles"));
    }

    #[test]
    fn nested_topic_description_editable() {
        let mut editor = syllabus_editor();
        let path = FieldPath::element("CourseTopics", 0).key("Description");
        editor.begin_edit(path.clone()).unwrap();
        editor.set_value(&path, "Smallest living units").unwrap();
        editor.commit(&path).unwrap();
        assert_eq!(editor.value(&FieldPath::element("CourseTopics", 0).key("Topic")), Some("Cells"));
        assert_eq!(editor.value(&path), Some("Smallest living units"));
    }

    #[test]
    fn begin_edit_rejects_non_text_and_missing() {
        let mut editor = syllabus_editor();
        assert!(matches!(
            editor.begin_edit(FieldPath::field("LearningOutcomes")),
            Err(EditorError::NotText(_))
        ));
        assert!(matches!(
            editor.begin_edit(FieldPath::element("LearningOutcomes", 9)),
            Err(EditorError::InvalidPath(_))
        ));
        assert!(!editor.is_editing());
    }

    #[test]
    fn append_activates_new_entry_and_skips_duplicates() {
        let mut editor = syllabus_editor();
        let goals = FieldPath::field("CourseGoals");
        let added = editor.append(&goals, "Rigor").unwrap().unwrap();
        assert_eq!(added, FieldPath::element("CourseGoals", 1));
        assert_eq!(editor.active(), Some(&added));
        editor.commit(&added).unwrap();

        assert_eq!(editor.append(&goals, "Rigor").unwrap(), None);
        assert_eq!(editor.append(&goals, "   ").unwrap(), None);
        match editor.committed_document().unwrap() {
            Document::Syllabus(s) => assert_eq!(s.course_goals, vec!["Curiosity", "Rigor"]),
            other => panic!("unexpected document {other:?}"),
        }
    }

    #[test]
    fn append_topic_object_uses_key_field() {
        let mut editor = syllabus_editor();
        let topics = FieldPath::field("CourseTopics");
        let added = editor.append(&topics, "Genetics").unwrap().unwrap();
        assert_eq!(added.to_string(), "CourseTopics[1].Topic");
        editor.cancel(&added).unwrap();
        // Appended entries are already saved; cancel only ends edit mode.
        assert_eq!(editor.value(&added), Some("Genetics"));
        editor.commit(&added).unwrap();
        assert_eq!(editor.append(&topics, "Cells").unwrap(), None);
    }

    #[test]
    fn append_blocked_during_edit_and_on_scalars() {
        let mut editor = syllabus_editor();
        assert!(matches!(
            editor.append(&title(), "x"),
            Err(EditorError::NotAppendable(_))
        ));
        editor.begin_edit(title()).unwrap();
        assert!(matches!(
            editor.append(&FieldPath::field("CourseGoals"), "x"),
            Err(EditorError::EditInProgress { .. })
        ));
    }

    #[test]
    fn course_plan_lecture_topics() {
        let plan = CoursePlan {
            plan: vec![Lecture {
                title: "Week 1".into(),
                topics: vec!["Cells".into()],
            }],
        };
        let mut editor = DocumentEditor::open(
            ArtifactIdentity { stage: Stage::CoursePlan, revision: 3 },
            &Document::CoursePlan(plan),
        )
        .unwrap();
        let topics = FieldPath::element("Plan", 0).key("Topics");
        let added = editor.append(&topics, "DNA").unwrap().unwrap();
        assert_eq!(added.to_string(), "Plan[0].Topics[1]");
        editor.commit(&added).unwrap();

        let lecture = FieldPath::field("Plan");
        let week2 = editor.append(&lecture, "Week 2").unwrap().unwrap();
        assert_eq!(week2.to_string(), "Plan[1].Title");
        editor.commit(&week2).unwrap();

        match editor.committed_document().unwrap() {
            Document::CoursePlan(p) => {
                assert_eq!(p.plan[0].topics, vec!["Cells", "DNA"]);
                assert_eq!(p.plan[1].title, "Week 2");
                assert!(p.plan[1].topics.is_empty());
            }
            other => panic!("unexpected document {other:?}"),
        }
    }

    #[test]
    fn any_operation_sequence_keeps_single_active_field() {
        let mut editor = syllabus_editor();
        let paths = [
            title(),
            FieldPath::field("CourseDescription"),
            FieldPath::element("LearningOutcomes", 0),
            FieldPath::element("CourseGoals", 0),
        ];
        // Deterministic pseudo-random walk over begin/commit/cancel.
        let mut seed: u32 = 7;
        for _ in 0..200 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let path = &paths[(seed >> 8) as usize % paths.len()];
            let _ = match (seed >> 4) % 3 {
                0 => editor.begin_edit(path.clone()).map(|_| ()),
                1 => editor.commit(path).map(|_| ()),
                _ => editor.cancel(path),
            };
            if let Some(active) = editor.active() {
                assert!(paths.contains(active));
            }
            let differing = paths
                .iter()
                .filter(|p| editor.value(p) != editor.committed_value(p))
                .count();
            assert!(differing <= 1);
        }
    }

    #[test]
    fn fields_flatten_in_document_order() {
        let editor = syllabus_editor();
        let fields = editor.fields();
        let paths: Vec<String> = fields.iter().map(|f| f.path.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "CourseTitle",
                "CourseDescription",
                "LearningOutcomes[0]",
                "LearningOutcomes[1]",
                "CourseGoals[0]",
                "CourseTopics[0].Topic",
                "CourseTopics[0].Description",
            ]
        );
        let title = fields.iter().find(|f| f.path == FieldPath::field("CourseTitle")).unwrap();
        assert_eq!(title.label, "Course Title");
        assert!(!title.multiline);
    }

    #[test]
    fn course_plan_fields_follow_lecture_order() {
        let plan = CoursePlan {
            plan: vec![Lecture {
                title: "Week 1".into(),
                topics: vec!["Cells".into(), "Tissues".into()],
            }],
        };
        let editor = DocumentEditor::open(identity(), &Document::CoursePlan(plan)).unwrap();
        let paths: Vec<String> = editor.fields().iter().map(|f| f.path.to_string()).collect();
        assert_eq!(paths, vec!["Plan[0].Title", "Plan[0].Topics[0]", "Plan[0].Topics[1]"]);
    }
}
