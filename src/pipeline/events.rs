use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editor::FieldPath;
use crate::models::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub dismissible: bool,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            created_at: Utc::now(),
            dismissible: true,
        }
    }

    pub fn saved() -> Self {
        Self::new(NotificationLevel::Success, "Field saved successfully!")
    }
}

/// Broadcast to every subscriber of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StageChanged { from: Stage, to: Stage },
    ArtifactStored { stage: Stage, revision: u64 },
    ArtifactsInvalidated { stages: Vec<Stage> },
    RequestStarted { ticket: Uuid, stage: Stage },
    ResponseDiscarded { ticket: Uuid, stage: Stage },
    FieldSaved { path: FieldPath, changed: bool },
    Notification(Notification),
}
