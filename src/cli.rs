//! Command-line front end.
//!
//! `run` replays a workflow script against the generation service: every
//! stage the educator would click through in the interactive flow is read
//! from a JSON file instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{self, GeneratorConfig};
use crate::editor::FieldPath;
use crate::export::{ExportError, LogoAsset, PdfExporter};
use crate::generator::{Generator, GeneratorError, HttpGenerator};
use crate::models::{BloomLevel, BloomSelection, ClassLevel, ContextSelection, Stage};
use crate::pipeline::{Completion, CoursePlanParams, WorkflowError, WorkflowSession};
use crate::upload::{
    detect_format, LocalStorage, MaterialCategory, MaterialRef, MaterialStorage, UploadError,
};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Cannot read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid script: {0}")]
    Script(#[from] serde_json::Error),

    #[error("Script names no material")]
    NoMaterial,

    #[error("{0} response was superseded")]
    Discarded(Stage),
}

#[derive(Debug, Parser)]
#[command(name = "lessonforge", about = "Turn source material into a syllabus and course plan")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a workflow script end to end and export the documents
    Run(RunArgs),
    /// Print the resolved generator configuration
    ShowConfig,
}

#[derive(Debug, Args, Clone)]
struct RunArgs {
    /// JSON workflow script
    #[arg(long)]
    script: PathBuf,
    /// Overrides LESSONFORGE_API_URL
    #[arg(long)]
    api_url: Option<String>,
    /// Defaults to ~/Lessonforge/exports
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> Result<(), CliError> {
        match self.command {
            Command::Run(args) => {
                let mut generator_config = GeneratorConfig::from_env();
                if let Some(url) = &args.api_url {
                    generator_config = generator_config.with_base_url(url);
                }
                let script = WorkflowScript::load(&args.script)?;
                let generator = HttpGenerator::new(&generator_config)?;
                let session = WorkflowSession::new(generator, &generator_config);
                let output_dir = args.output_dir.unwrap_or_else(config::exports_dir);

                let written = run_script(&session, &script, &output_dir).await?;
                for path in written {
                    println!("{}", path.display());
                }
                Ok(())
            }
            Command::ShowConfig => {
                let resolved = GeneratorConfig::from_env();
                println!("{}", serde_json::to_string_pretty(&resolved)?);
                Ok(())
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Workflow script
// ═══════════════════════════════════════════════════════════

/// One field edit applied to the generated syllabus.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEdit {
    pub path: FieldPath,
    pub value: String,
}

/// Answers for every interactive step of a workflow.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowScript {
    /// URL or pasted text.
    #[serde(default)]
    pub material: Option<MaterialRef>,
    /// Local file, uploaded before analysis. Takes precedence over `material`.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Empty means every topic the analysis found.
    #[serde(default)]
    pub topics: Vec<String>,
    pub class_level: ClassLevel,
    pub bloom_levels: Vec<BloomLevel>,
    #[serde(default)]
    pub fetch_objectives: bool,
    /// Objectives to select; ones not offered by the service are added as custom.
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub edits: Vec<ScriptEdit>,
    pub lessons: u32,
    pub lesson_duration: u32,
    #[serde(default)]
    pub logo: Option<PathBuf>,
}

impl WorkflowScript {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(raw)?)
    }

    fn material(&self, storage: &dyn MaterialStorage) -> Result<MaterialRef, CliError> {
        if let Some(file) = &self.file {
            let format = detect_format(file)?;
            if format.category == MaterialCategory::PlainText {
                let text = std::fs::read_to_string(file)?;
                return Ok(MaterialRef::text(&text)?);
            }
            let stored = storage.store(file)?;
            return Ok(MaterialRef::stored(&stored));
        }
        self.material.clone().ok_or(CliError::NoMaterial)
    }
}

fn expect_applied(completion: Completion, stage: Stage) -> Result<(), CliError> {
    match completion {
        Completion::Applied { .. } => Ok(()),
        Completion::Discarded => Err(CliError::Discarded(stage)),
        Completion::Failed(e) => Err(e.into()),
    }
}

/// Drive a session through every stage and export both documents.
pub async fn run_script<G: Generator + 'static>(
    session: &WorkflowSession<G>,
    script: &WorkflowScript,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, CliError> {
    let storage = LocalStorage::default_location();
    let material = script.material(&storage)?;
    expect_applied(session.analyze(material).await?, Stage::Source)?;

    let topics: Vec<String> = if script.topics.is_empty() {
        session.with(|c| Ok(c.topic_choices()?.iter().map(|t| t.topic.clone()).collect()))?
    } else {
        script.topics.clone()
    };
    session.with(|c| {
        c.submit_context(
            ContextSelection::new()
                .with_topics(topics)
                .with_class_level(script.class_level),
        )
    })?;

    let bloom = BloomSelection::from_levels(script.bloom_levels.iter().copied());
    if script.fetch_objectives {
        expect_applied(session.fetch_objectives(&bloom).await?, Stage::Pedagogical)?;
    }
    session.with(|c| {
        let objectives = c.objectives_mut();
        for objective in &script.objectives {
            if objectives.available.contains(objective) {
                if !objectives.selected.contains(objective) {
                    objectives.toggle(objective);
                }
            } else {
                objectives.add_custom(objective);
            }
        }
        c.submit_pedagogy(bloom)
    })?;

    expect_applied(session.generate_syllabus().await?, Stage::Syllabus)?;
    session.with(|c| {
        for edit in &script.edits {
            c.begin_edit(edit.path.clone())?;
            c.set_value(&edit.path, edit.value.clone())?;
            c.commit(&edit.path)?;
        }
        c.proceed()
    })?;

    let params = CoursePlanParams::new(script.lessons, script.lesson_duration)?;
    expect_applied(session.generate_course_plan(params).await?, Stage::CoursePlan)?;

    let mut exporter = PdfExporter::new();
    if let Some(logo) = &script.logo {
        exporter = exporter.with_logo(LogoAsset::from_file(logo)?);
    }
    let exporter = Arc::new(exporter);

    let mut written = Vec::new();
    for stage in [Stage::Syllabus, Stage::CoursePlan] {
        written.push(session.export(stage, exporter.clone(), output_dir).await?);
    }
    tracing::info!(files = written.len(), "Workflow script finished");
    Ok(written)
}
