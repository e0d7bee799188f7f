//! Outputs of completed stages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::WorkflowError;
use crate::editor::ArtifactIdentity;
use crate::models::{
    Analysis, ContextSelection, CoursePlan, Document, PedagogicalSelection, Stage, Syllabus,
};

/// The structured output of completing a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "artifact", rename_all = "snake_case")]
pub enum Artifact {
    Source(Analysis),
    Contextual(ContextSelection),
    Pedagogical(PedagogicalSelection),
    Syllabus(Syllabus),
    CoursePlan(CoursePlan),
}

impl Artifact {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Source(_) => Stage::Source,
            Self::Contextual(_) => Stage::Contextual,
            Self::Pedagogical(_) => Stage::Pedagogical,
            Self::Syllabus(_) => Stage::Syllabus,
            Self::CoursePlan(_) => Stage::CoursePlan,
        }
    }

    /// The editable document carried by this artifact, if any.
    pub fn document(&self) -> Option<Document> {
        match self {
            Self::Syllabus(s) => Some(Document::Syllabus(s.clone())),
            Self::CoursePlan(p) => Some(Document::CoursePlan(p.clone())),
            _ => None,
        }
    }
}

impl From<Document> for Artifact {
    fn from(document: Document) -> Self {
        match document {
            Document::Syllabus(s) => Self::Syllabus(s),
            Document::CoursePlan(p) => Self::CoursePlan(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Slot {
    artifact: Artifact,
    revision: u64,
}

/// Holds at most one artifact per stage.
///
/// Every `put` assigns a fresh revision from a store-wide counter, so an
/// [`ArtifactIdentity`] never refers to two different generated artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStore {
    slots: BTreeMap<Stage, Slot>,
    last_revision: u64,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `artifact` for `stage`, replacing any previous one.
    pub fn put(&mut self, stage: Stage, artifact: Artifact) -> Result<u64, WorkflowError> {
        if artifact.stage() != stage {
            return Err(WorkflowError::ArtifactMismatch(stage));
        }
        self.last_revision += 1;
        let revision = self.last_revision;
        self.slots.insert(stage, Slot { artifact, revision });
        Ok(revision)
    }

    pub fn get(&self, stage: Stage) -> Option<&Artifact> {
        self.slots.get(&stage).map(|slot| &slot.artifact)
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.slots.contains_key(&stage)
    }

    pub fn identity(&self, stage: Stage) -> Option<ArtifactIdentity> {
        self.slots.get(&stage).map(|slot| ArtifactIdentity {
            stage,
            revision: slot.revision,
        })
    }

    /// Remove `stage` and every later stage. Returns the stages that held an artifact.
    pub fn invalidate_from(&mut self, stage: Stage) -> Vec<Stage> {
        stage
            .downstream_inclusive()
            .iter()
            .filter(|s| self.slots.remove(*s).is_some())
            .copied()
            .collect()
    }

    /// Every predecessor of `stage` has produced its artifact.
    pub fn is_reachable(&self, stage: Stage) -> bool {
        stage.predecessors().iter().all(|s| self.contains(*s))
    }

    /// Write an edited document back without changing its revision.
    pub fn replace_document(
        &mut self,
        identity: ArtifactIdentity,
        document: Document,
    ) -> Result<(), WorkflowError> {
        let slot = self
            .slots
            .get_mut(&identity.stage)
            .ok_or(WorkflowError::MissingArtifact(identity.stage))?;
        if slot.revision != identity.revision {
            return Err(WorkflowError::StaleWorkingCopy(identity.stage));
        }
        if document.stage() != identity.stage {
            return Err(WorkflowError::ArtifactMismatch(identity.stage));
        }
        slot.artifact = Artifact::from(document);
        Ok(())
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.slots.keys().copied()
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        match self.get(Stage::Source) {
            Some(Artifact::Source(a)) => Some(a),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&ContextSelection> {
        match self.get(Stage::Contextual) {
            Some(Artifact::Contextual(c)) => Some(c),
            _ => None,
        }
    }

    pub fn pedagogy(&self) -> Option<&PedagogicalSelection> {
        match self.get(Stage::Pedagogical) {
            Some(Artifact::Pedagogical(p)) => Some(p),
            _ => None,
        }
    }

    pub fn syllabus(&self) -> Option<&Syllabus> {
        match self.get(Stage::Syllabus) {
            Some(Artifact::Syllabus(s)) => Some(s),
            _ => None,
        }
    }

    pub fn course_plan(&self) -> Option<&CoursePlan> {
        match self.get(Stage::CoursePlan) {
            Some(Artifact::CoursePlan(p)) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloomLevel, BloomSelection, TopicEntry};

    fn analysis() -> Artifact {
        Artifact::Source(Analysis::new("English", vec![TopicEntry::new("Cells", "")]))
    }

    fn filled_store() -> ArtifactStore {
        let mut store = ArtifactStore::new();
        store.put(Stage::Source, analysis()).unwrap();
        store
            .put(
                Stage::Contextual,
                Artifact::Contextual(ContextSelection::new().with_topics(["Cells"])),
            )
            .unwrap();
        store
            .put(
                Stage::Pedagogical,
                Artifact::Pedagogical(PedagogicalSelection::new(BloomSelection::up_to(
                    BloomLevel::Apply,
                ))),
            )
            .unwrap();
        store
            .put(Stage::Syllabus, Artifact::Syllabus(Syllabus::default()))
            .unwrap();
        store
    }

    #[test]
    fn put_rejects_wrong_stage() {
        let mut store = ArtifactStore::new();
        assert!(matches!(
            store.put(Stage::Syllabus, analysis()),
            Err(WorkflowError::ArtifactMismatch(Stage::Syllabus))
        ));
        assert!(store.get(Stage::Syllabus).is_none());
    }

    #[test]
    fn put_overwrites_with_new_revision() {
        let mut store = ArtifactStore::new();
        let first = store.put(Stage::Source, analysis()).unwrap();
        let second = store.put(Stage::Source, analysis()).unwrap();
        assert!(second > first);
        assert_eq!(store.identity(Stage::Source).unwrap().revision, second);
    }

    #[test]
    fn invalidate_from_clears_stage_and_later() {
        let mut store = filled_store();
        let removed = store.invalidate_from(Stage::Pedagogical);
        assert_eq!(removed, vec![Stage::Pedagogical, Stage::Syllabus]);
        assert!(store.contains(Stage::Contextual));
        assert!(!store.contains(Stage::Syllabus));
        assert!(store.invalidate_from(Stage::CoursePlan).is_empty());
    }

    #[test]
    fn reachability_requires_all_predecessors() {
        let mut store = filled_store();
        assert!(store.is_reachable(Stage::CoursePlan));
        store.invalidate_from(Stage::Contextual);
        assert!(store.is_reachable(Stage::Contextual));
        assert!(!store.is_reachable(Stage::Pedagogical));
        assert!(ArtifactStore::new().is_reachable(Stage::Source));
    }

    #[test]
    fn replace_document_checks_revision() {
        let mut store = filled_store();
        let identity = store.identity(Stage::Syllabus).unwrap();
        let edited = Syllabus {
            course_title: "Edited".into(),
            ..Syllabus::default()
        };
        store
            .replace_document(identity, Document::Syllabus(edited.clone()))
            .unwrap();
        assert_eq!(store.syllabus(), Some(&edited));
        assert_eq!(store.identity(Stage::Syllabus), Some(identity));

        store
            .put(Stage::Syllabus, Artifact::Syllabus(Syllabus::default()))
            .unwrap();
        assert!(matches!(
            store.replace_document(identity, Document::Syllabus(edited)),
            Err(WorkflowError::StaleWorkingCopy(Stage::Syllabus))
        ));
    }

    #[test]
    fn snapshot_round_trips() {
        let store = filled_store();
        let json = serde_json::to_string(&store).unwrap();
        let back: ArtifactStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
