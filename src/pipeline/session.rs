//! Async driver around the controller.
//!
//! The controller sits behind a `std::sync::Mutex` that is only held for
//! synchronous state changes, never across an await. Generator calls run
//! outside the lock and re-enter it to complete their ticket.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;

use super::controller::{Completion, WorkflowController};
use super::events::WorkflowEvent;
use super::ticket::GenerationTicket;
use super::transform::CoursePlanParams;
use super::WorkflowError;
use crate::config::GeneratorConfig;
use crate::export::{ExportError, Exporter};
use crate::generator::Generator;
use crate::models::{BloomSelection, Stage};
use crate::upload::MaterialRef;

pub struct WorkflowSession<G: Generator> {
    controller: Arc<Mutex<WorkflowController>>,
    generator: Arc<G>,
    timeout: Duration,
}

impl<G: Generator> Clone for WorkflowSession<G> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            generator: Arc::clone(&self.generator),
            timeout: self.timeout,
        }
    }
}

impl<G: Generator> WorkflowSession<G> {
    pub fn new(generator: G, config: &GeneratorConfig) -> Self {
        Self::with_controller(WorkflowController::new(), generator, config.timeout())
    }

    pub fn with_controller(controller: WorkflowController, generator: G, timeout: Duration) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            generator: Arc::new(generator),
            timeout,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    fn lock(&self) -> Result<MutexGuard<'_, WorkflowController>, WorkflowError> {
        self.controller.lock().map_err(|_| WorkflowError::LockPoisoned)
    }

    /// Run a synchronous operation against the controller.
    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut WorkflowController) -> Result<R, WorkflowError>,
    ) -> Result<R, WorkflowError> {
        let mut controller = self.lock()?;
        f(&mut controller)
    }

    pub fn current_stage(&self) -> Result<Stage, WorkflowError> {
        self.with(|c| Ok(c.current_stage()))
    }

    pub fn subscribe(&self) -> Result<broadcast::Receiver<WorkflowEvent>, WorkflowError> {
        self.with(|c| Ok(c.subscribe()))
    }

    /// Execute a ticket and hand its outcome back to the controller.
    pub async fn run(&self, ticket: GenerationTicket) -> Result<Completion, WorkflowError> {
        let outcome = ticket.execute(self.generator.as_ref(), self.timeout).await;
        self.with(|c| Ok(c.complete(&ticket, outcome)))
    }

    pub async fn analyze(&self, material: MaterialRef) -> Result<Completion, WorkflowError> {
        let ticket = self.with(|c| c.prepare_analysis(material))?;
        self.run(ticket).await
    }

    pub async fn fetch_objectives(&self, bloom: &BloomSelection) -> Result<Completion, WorkflowError> {
        let ticket = self.with(|c| c.prepare_objectives(bloom))?;
        self.run(ticket).await
    }

    pub async fn generate_syllabus(&self) -> Result<Completion, WorkflowError> {
        let ticket = self.with(|c| c.prepare_syllabus())?;
        self.run(ticket).await
    }

    pub async fn generate_course_plan(
        &self,
        params: CoursePlanParams,
    ) -> Result<Completion, WorkflowError> {
        let ticket = self.with(|c| c.prepare_course_plan(params))?;
        self.run(ticket).await
    }

    /// Render the committed document of `stage` and write it under `dir`.
    pub async fn export<E>(
        &self,
        stage: Stage,
        exporter: Arc<E>,
        dir: &Path,
    ) -> Result<PathBuf, WorkflowError>
    where
        E: Exporter + 'static,
    {
        let document = self.with(|c| c.exportable(stage))?;
        let file_name = exporter.file_name(&document);

        let bytes = tokio::task::spawn_blocking(move || exporter.export(&document))
            .await
            .map_err(|e| ExportError::Task(e.to_string()))??;

        tokio::fs::create_dir_all(dir).await.map_err(ExportError::from)?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes).await.map_err(ExportError::from)?;
        tracing::info!(stage = %stage, path = %path.display(), "Document exported");
        Ok(path)
    }
}
