//! The workflow state machine.
//!
//! The controller owns the current stage, the artifact store, the open
//! document editor and the single outstanding generator request. It does no
//! I/O: requests leave as [`GenerationTicket`]s and come back through
//! [`WorkflowController::complete`].

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::events::{Notification, NotificationLevel, WorkflowEvent};
use super::store::{Artifact, ArtifactStore};
use super::ticket::{GenerationRequest, GenerationTicket, Generated};
use super::transform::{
    build_course_plan_request, build_objectives_request, build_syllabus_request,
    collect_objectives, filter_topics_by_language, CoursePlanParams,
};
use super::WorkflowError;
use crate::editor::{DocumentEditor, EditableField, FieldPath, SavedField};
use crate::generator::GeneratorError;
use crate::models::{
    BloomLevel, BloomSelection, ContextSelection, Document, DocumentKind, ObjectiveSelection,
    PedagogicalSelection, Stage, TopicEntry,
};
use crate::upload::MaterialRef;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug)]
struct PendingRequest {
    id: Uuid,
    stage: Stage,
    cancel: CancellationToken,
}

/// What happened to a generator response.
#[derive(Debug)]
pub enum Completion {
    /// Stored. `current` is the stage the workflow is at afterwards.
    Applied { stage: Stage, current: Stage },
    /// The requesting stage is no longer current; nothing changed.
    Discarded,
    /// The request failed; the workflow stays where it was.
    Failed(WorkflowError),
}

impl Completion {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

pub struct WorkflowController {
    current: Stage,
    store: ArtifactStore,
    editor: Option<DocumentEditor>,
    objectives: ObjectiveSelection,
    epoch: u64,
    pending: Option<PendingRequest>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl Default for WorkflowController {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowController {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            current: Stage::FIRST,
            store: ArtifactStore::new(),
            editor: None,
            objectives: ObjectiveSelection::default(),
            epoch: 0,
            pending: None,
            events,
        }
    }

    /// Resume from a saved store. Starts at the furthest reachable stage.
    pub fn with_store(store: ArtifactStore) -> Self {
        let mut controller = Self::new();
        controller.current = Stage::ALL
            .iter()
            .rev()
            .copied()
            .find(|s| store.is_reachable(*s))
            .unwrap_or(Stage::FIRST);
        controller.store = store;
        controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn current_stage(&self) -> Stage {
        self.current
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Stage of the outstanding request, if any.
    pub fn pending_stage(&self) -> Option<Stage> {
        self.pending.as_ref().map(|p| p.stage)
    }

    /// The workflow has reached its end: at the last stage with its artifact present.
    pub fn is_finished(&self) -> bool {
        self.current == Stage::LAST && self.store.contains(Stage::LAST)
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.emit(WorkflowEvent::Notification(Notification::new(level, message)));
    }

    // ═══════════════════════════════════════════════════════════
    // Navigation
    // ═══════════════════════════════════════════════════════════

    /// Store `artifact` as the output of the current stage and move on.
    ///
    /// The last stage has no successor and stays current. A different
    /// artifact than the one already stored invalidates every later stage.
    pub fn advance(&mut self, stage: Stage, artifact: Artifact) -> Result<Stage, WorkflowError> {
        if stage != self.current {
            return Err(WorkflowError::InvalidTransition {
                stage,
                current: self.current,
            });
        }
        if let Some(active) = self.active_edit() {
            return Err(WorkflowError::edit_in_progress(active));
        }
        self.record(stage, artifact)?;

        if let Some(next) = stage.successor() {
            self.move_to(next);
        }
        Ok(self.current)
    }

    /// Advance using the artifact already stored for the current stage.
    pub fn proceed(&mut self) -> Result<Stage, WorkflowError> {
        let stage = self.current;
        let artifact = self
            .store
            .get(stage)
            .cloned()
            .ok_or(WorkflowError::MissingArtifact(stage))?;
        self.advance(stage, artifact)
    }

    /// Go back to `target`. Downstream artifacts are kept.
    pub fn rewind(&mut self, target: Stage) -> Result<(), WorkflowError> {
        if target > self.current {
            return Err(WorkflowError::InvalidTransition {
                stage: target,
                current: self.current,
            });
        }
        self.move_to(target);
        Ok(())
    }

    /// Move to any stage whose predecessors all have artifacts.
    pub fn jump_to(&mut self, target: Stage) -> Result<(), WorkflowError> {
        if target <= self.current {
            return self.rewind(target);
        }
        if !self.store.is_reachable(target) {
            return Err(WorkflowError::InvalidTransition {
                stage: target,
                current: self.current,
            });
        }
        self.move_to(target);
        Ok(())
    }

    /// Store an artifact without moving. Returns whether it differed from
    /// the stored one.
    fn record(&mut self, stage: Stage, artifact: Artifact) -> Result<bool, WorkflowError> {
        if self.store.get(stage) == Some(&artifact) {
            return Ok(false);
        }
        let revision = self.store.put(stage, artifact)?;
        self.emit(WorkflowEvent::ArtifactStored { stage, revision });

        if self
            .editor
            .as_ref()
            .is_some_and(|e| e.identity().stage >= stage)
        {
            self.editor = None;
        }
        if let Some(next) = stage.successor() {
            self.invalidate_from(next);
        }
        Ok(true)
    }

    fn invalidate_from(&mut self, stage: Stage) {
        let stages = self.store.invalidate_from(stage);
        if stage <= Stage::Pedagogical {
            self.objectives = ObjectiveSelection::default();
        }
        if self.pending.as_ref().is_some_and(|p| p.stage >= stage) {
            self.cancel_pending();
        }
        if !stages.is_empty() {
            tracing::debug!(from = %stage, count = stages.len(), "Artifacts invalidated");
            self.emit(WorkflowEvent::ArtifactsInvalidated { stages });
        }
    }

    fn move_to(&mut self, target: Stage) {
        if target == self.current {
            return;
        }
        let from = self.current;
        self.epoch += 1;
        self.cancel_pending();
        if self
            .editor
            .as_ref()
            .is_some_and(|e| e.identity().stage != target)
        {
            self.editor = None;
        }
        self.current = target;
        tracing::info!(from = %from, to = %target, "Stage changed");
        self.emit(WorkflowEvent::StageChanged { from, to: target });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
        }
    }

    fn ensure_current(&self, stage: Stage) -> Result<(), WorkflowError> {
        if self.current == stage {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                stage,
                current: self.current,
            })
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Selections
    // ═══════════════════════════════════════════════════════════

    /// Topics of the analysis offered for selection, filtered by its language.
    pub fn topic_choices(&self) -> Result<&[TopicEntry], WorkflowError> {
        let analysis = self
            .store
            .analysis()
            .ok_or(WorkflowError::MissingArtifact(Stage::Source))?;
        Ok(filter_topics_by_language(
            &analysis.main_topics,
            &analysis.language,
        ))
    }

    pub fn submit_context(&mut self, selection: ContextSelection) -> Result<Stage, WorkflowError> {
        self.ensure_current(Stage::Contextual)?;
        if selection.selected_topics.is_empty() {
            return Err(WorkflowError::EmptySelection("topics".into()));
        }
        if selection.class_level.is_none() {
            return Err(WorkflowError::EmptySelection("class level".into()));
        }
        self.advance(Stage::Contextual, Artifact::Contextual(selection))
    }

    /// Objectives offered by the last objectives response plus custom ones.
    pub fn objectives(&self) -> &ObjectiveSelection {
        &self.objectives
    }

    pub fn objectives_mut(&mut self) -> &mut ObjectiveSelection {
        &mut self.objectives
    }

    /// Submit the Bloom levels; the currently selected objectives travel along.
    pub fn submit_pedagogy(&mut self, bloom: BloomSelection) -> Result<Stage, WorkflowError> {
        self.ensure_current(Stage::Pedagogical)?;
        if bloom.is_empty() {
            return Err(WorkflowError::EmptySelection("Bloom levels".into()));
        }
        let selection = PedagogicalSelection::new(bloom).with_objectives(&self.objectives.selected);
        self.advance(Stage::Pedagogical, Artifact::Pedagogical(selection))
    }

    // ═══════════════════════════════════════════════════════════
    // Generation requests
    // ═══════════════════════════════════════════════════════════

    /// Issue a ticket. An outstanding request is superseded and cancelled.
    fn issue(&mut self, request: GenerationRequest) -> GenerationTicket {
        self.cancel_pending();
        let cancel = CancellationToken::new();
        let ticket = GenerationTicket::new(request, self.epoch, cancel.clone());
        self.pending = Some(PendingRequest {
            id: ticket.id,
            stage: ticket.stage,
            cancel,
        });
        tracing::debug!(
            ticket = %ticket.id,
            stage = %ticket.stage,
            kind = ticket.request.label(),
            "Generation requested"
        );
        self.emit(WorkflowEvent::RequestStarted {
            ticket: ticket.id,
            stage: ticket.stage,
        });
        ticket
    }

    pub fn prepare_analysis(&mut self, material: MaterialRef) -> Result<GenerationTicket, WorkflowError> {
        self.ensure_current(Stage::Source)?;
        Ok(self.issue(GenerationRequest::Analysis(material)))
    }

    pub fn prepare_objectives(
        &mut self,
        bloom: &BloomSelection,
    ) -> Result<GenerationTicket, WorkflowError> {
        self.ensure_current(Stage::Pedagogical)?;
        let context = self
            .store
            .context()
            .ok_or(WorkflowError::MissingArtifact(Stage::Contextual))?;
        let request = build_objectives_request(context, bloom.levels())?;
        Ok(self.issue(GenerationRequest::Objectives(request)))
    }

    pub fn prepare_syllabus(&mut self) -> Result<GenerationTicket, WorkflowError> {
        self.ensure_current(Stage::Syllabus)?;
        if let Some(active) = self.active_edit() {
            return Err(WorkflowError::edit_in_progress(active));
        }
        let analysis = self
            .store
            .analysis()
            .ok_or(WorkflowError::MissingArtifact(Stage::Source))?;
        let context = self
            .store
            .context()
            .ok_or(WorkflowError::MissingArtifact(Stage::Contextual))?;
        let pedagogy = self
            .store
            .pedagogy()
            .ok_or(WorkflowError::MissingArtifact(Stage::Pedagogical))?;
        let request = build_syllabus_request(analysis, context, pedagogy)?;
        Ok(self.issue(GenerationRequest::Syllabus(request)))
    }

    /// Course plans are built from the committed syllabus, so an open edit blocks them.
    pub fn prepare_course_plan(
        &mut self,
        params: CoursePlanParams,
    ) -> Result<GenerationTicket, WorkflowError> {
        self.ensure_current(Stage::CoursePlan)?;
        if let Some(active) = self.active_edit() {
            return Err(WorkflowError::edit_in_progress(active));
        }
        let analysis = self
            .store
            .analysis()
            .ok_or(WorkflowError::MissingArtifact(Stage::Source))?;
        let syllabus = self
            .store
            .syllabus()
            .ok_or(WorkflowError::MissingArtifact(Stage::Syllabus))?;
        let request = build_course_plan_request(analysis, syllabus, params);
        Ok(self.issue(GenerationRequest::CoursePlan(request)))
    }

    /// Apply the outcome of `ticket`, unless the workflow moved on since it was issued.
    pub fn complete(
        &mut self,
        ticket: &GenerationTicket,
        outcome: Result<Generated, GeneratorError>,
    ) -> Completion {
        let is_pending = self.pending.as_ref().is_some_and(|p| p.id == ticket.id);
        if !is_pending {
            tracing::debug!(
                ticket = %ticket.id,
                stage = %ticket.stage,
                "Discarding response for a ticket that is not outstanding"
            );
            return self.discard(ticket);
        }
        if ticket.stage != self.current || ticket.epoch != self.epoch {
            tracing::debug!(
                ticket = %ticket.id,
                stage = %ticket.stage,
                current = %self.current,
                "Discarding stale generation response"
            );
            return self.discard(ticket);
        }
        self.pending = None;

        // A regenerated document never overwrites a field being edited.
        if DocumentKind::for_stage(ticket.stage).is_some() {
            if let Some(active) = self.active_edit().cloned() {
                tracing::warn!(
                    ticket = %ticket.id,
                    stage = %ticket.stage,
                    field = %active,
                    "Generated document held back by a pending edit"
                );
                self.notify(
                    NotificationLevel::Warning,
                    format!(
                        "The new {} was not applied: finish editing {active} first.",
                        ticket.request.label()
                    ),
                );
                return Completion::Failed(WorkflowError::edit_in_progress(&active));
            }
        }

        match outcome.and_then(|generated| self.apply(ticket, generated)) {
            Ok(current) => Completion::Applied {
                stage: ticket.stage,
                current,
            },
            Err(e) => Completion::Failed(self.report_failure(ticket, e)),
        }
    }

    fn discard(&self, ticket: &GenerationTicket) -> Completion {
        self.emit(WorkflowEvent::ResponseDiscarded {
            ticket: ticket.id,
            stage: ticket.stage,
        });
        Completion::Discarded
    }

    fn apply(&mut self, ticket: &GenerationTicket, generated: Generated) -> Result<Stage, GeneratorError> {
        let artifact = match (&ticket.request, generated) {
            (GenerationRequest::Analysis(_), Generated::Analysis(analysis)) => Artifact::Source(analysis),
            (GenerationRequest::Syllabus(_), Generated::Syllabus(syllabus)) => Artifact::Syllabus(syllabus),
            (GenerationRequest::CoursePlan(_), Generated::CoursePlan(plan)) => Artifact::CoursePlan(plan),
            (GenerationRequest::Objectives(request), Generated::Objectives(map)) => {
                let depth = (request.level + 1).min(BloomLevel::ALL.len());
                let offered = collect_objectives(&map, &BloomLevel::ALL[..depth]);
                self.objectives = ObjectiveSelection::from_available(offered);
                return Ok(self.current);
            }
            (request, _) => {
                return Err(GeneratorError::Malformed(format!(
                    "response does not match the {} request",
                    request.label()
                )))
            }
        };
        self.accept(artifact)
            .map_err(|e| GeneratorError::Malformed(e.to_string()))
    }

    /// Analyses move the workflow on; documents are stored and opened for review.
    fn accept(&mut self, artifact: Artifact) -> Result<Stage, WorkflowError> {
        let stage = artifact.stage();
        if DocumentKind::for_stage(stage).is_none() {
            return self.advance(stage, artifact);
        }
        self.record(stage, artifact)?;
        self.open_document(stage)?;
        Ok(self.current)
    }

    fn report_failure(&self, ticket: &GenerationTicket, error: GeneratorError) -> WorkflowError {
        let what = ticket.request.label();
        if error.is_malformed() {
            tracing::error!(
                kind = "malformed_artifact",
                stage = %ticket.stage,
                error = %error,
                "Generated {what} could not be read"
            );
            self.notify(
                NotificationLevel::Error,
                format!("Failed to generate {what}: the response could not be read."),
            );
            WorkflowError::MalformedArtifact(error.to_string())
        } else {
            tracing::warn!(stage = %ticket.stage, error = %error, "Generating {what} failed");
            self.notify(
                NotificationLevel::Warning,
                format!("Failed to generate {what}: {error}"),
            );
            WorkflowError::GenerationFailed(error.to_string())
        }
    }

    // ═══════════════════════════════════════════════════════════
    // Editing
    // ═══════════════════════════════════════════════════════════

    pub fn editor(&self) -> Option<&DocumentEditor> {
        self.editor.as_ref()
    }

    /// The field currently in edit mode, if any.
    pub fn active_edit(&self) -> Option<&FieldPath> {
        self.editor.as_ref().and_then(|e| e.active())
    }

    /// Open the document stored for the current stage.
    pub fn open_document(&mut self, stage: Stage) -> Result<(), WorkflowError> {
        self.ensure_current(stage)?;
        let identity = self
            .store
            .identity(stage)
            .ok_or(WorkflowError::MissingArtifact(stage))?;
        if self.editor.as_ref().is_some_and(|e| e.identity() == identity) {
            return Ok(());
        }
        if let Some(active) = self.active_edit() {
            return Err(WorkflowError::edit_in_progress(active));
        }
        let document = self
            .store
            .get(stage)
            .and_then(Artifact::document)
            .ok_or(WorkflowError::NoOpenDocument)?;
        self.editor = Some(DocumentEditor::open(identity, &document)?);
        Ok(())
    }

    pub fn close_document(&mut self) {
        self.editor = None;
    }

    fn editor_mut(&mut self) -> Result<&mut DocumentEditor, WorkflowError> {
        self.editor.as_mut().ok_or(WorkflowError::NoOpenDocument)
    }

    pub fn fields(&self) -> Result<Vec<EditableField>, WorkflowError> {
        self.editor
            .as_ref()
            .map(DocumentEditor::fields)
            .ok_or(WorkflowError::NoOpenDocument)
    }

    pub fn begin_edit(&mut self, path: FieldPath) -> Result<(), WorkflowError> {
        Ok(self.editor_mut()?.begin_edit(path)?)
    }

    pub fn set_value(&mut self, path: &FieldPath, value: impl Into<String>) -> Result<(), WorkflowError> {
        Ok(self.editor_mut()?.set_value(path, value)?)
    }

    pub fn cancel_edit(&mut self, path: &FieldPath) -> Result<(), WorkflowError> {
        Ok(self.editor_mut()?.cancel(path)?)
    }

    /// Commit the active field and write the document back to the store.
    pub fn commit(&mut self, path: &FieldPath) -> Result<Option<SavedField>, WorkflowError> {
        let Some(saved) = self.editor_mut()?.commit(path)? else {
            return Ok(None);
        };
        self.write_back(saved.changed)?;
        tracing::debug!(path = %saved.path, changed = saved.changed, "Field committed");
        self.emit(WorkflowEvent::FieldSaved {
            path: saved.path.clone(),
            changed: saved.changed,
        });
        self.emit(WorkflowEvent::Notification(Notification::saved()));
        Ok(Some(saved))
    }

    /// Append an entry to an array field. Duplicates are ignored.
    pub fn append(&mut self, array: &FieldPath, text: &str) -> Result<Option<FieldPath>, WorkflowError> {
        let added = self.editor_mut()?.append(array, text)?;
        if added.is_some() {
            self.write_back(true)?;
        }
        Ok(added)
    }

    fn write_back(&mut self, changed: bool) -> Result<(), WorkflowError> {
        let editor = self.editor.as_ref().ok_or(WorkflowError::NoOpenDocument)?;
        let identity = editor.identity();
        let document = editor.committed_document()?;
        self.store.replace_document(identity, document)?;
        if changed {
            if let Some(next) = identity.stage.successor() {
                self.invalidate_from(next);
            }
        }
        Ok(())
    }

    /// Committed document of `stage`, ready for export.
    pub fn exportable(&self, stage: Stage) -> Result<Document, WorkflowError> {
        if let Some(active) = self.active_edit() {
            return Err(WorkflowError::edit_in_progress(active));
        }
        self.store
            .get(stage)
            .ok_or(WorkflowError::MissingArtifact(stage))?
            .document()
            .ok_or(WorkflowError::ArtifactMismatch(stage))
    }
}
