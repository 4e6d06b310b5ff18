//! Session state for one generation request.
//!
//! Phase-specific fields live inside [`Stage`] so a queue position can only
//! exist while queued, a video url only after success, and so on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{domain::TaskId, protocol::StatusUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Submitting,
    Queued,
    Processing,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Create call failed or returned no task identifier.
    Submission,
    /// Transport failure on a status check.
    Polling,
    /// Status check reported a failure.
    Server,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Submitting,
    Queued {
        queue_position: Option<u32>,
    },
    Processing {
        progress_percent: Option<u8>,
    },
    Succeeded {
        video_url: String,
        cover_image_url: Option<String>,
    },
    Failed {
        kind: FailureKind,
        error_message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationSession {
    task_id: Option<TaskId>,
    status_message: String,
    #[serde(flatten)]
    stage: Stage,
}

impl GenerationSession {
    pub(crate) fn submitting() -> Self {
        Self {
            task_id: None,
            status_message: "Submitting request".to_string(),
            stage: Stage::Submitting,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.stage {
            Stage::Idle => Phase::Idle,
            Stage::Submitting => Phase::Submitting,
            Stage::Queued { .. } => Phase::Queued,
            Stage::Processing { .. } => Phase::Processing,
            Stage::Succeeded { .. } => Phase::Succeeded,
            Stage::Failed { .. } => Phase::Failed,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn queue_position(&self) -> Option<u32> {
        match self.stage {
            Stage::Queued { queue_position } => queue_position,
            _ => None,
        }
    }

    pub fn progress_percent(&self) -> Option<u8> {
        match self.stage {
            Stage::Processing { progress_percent } => progress_percent,
            _ => None,
        }
    }

    pub fn video_url(&self) -> Option<&str> {
        match &self.stage {
            Stage::Succeeded { video_url, .. } => Some(video_url),
            _ => None,
        }
    }

    pub fn cover_image_url(&self) -> Option<&str> {
        match &self.stage {
            Stage::Succeeded {
                cover_image_url, ..
            } => cover_image_url.as_deref(),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.stage {
            Stage::Failed { error_message, .. } => Some(error_message),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.stage {
            Stage::Failed { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// True while a poll loop is expected to be driving the session.
    pub fn is_pending(&self) -> bool {
        matches!(self.phase(), Phase::Queued | Phase::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase(), Phase::Succeeded | Phase::Failed)
    }

    pub(crate) fn accept(&mut self, task_id: TaskId, update: StatusUpdate) {
        self.task_id = Some(task_id);
        self.apply(update);
    }

    pub(crate) fn apply(&mut self, update: StatusUpdate) {
        match update {
            StatusUpdate::Queued {
                message,
                queue_position,
            } => {
                self.status_message = message;
                self.stage = Stage::Queued { queue_position };
            }
            StatusUpdate::Processing { message, progress } => {
                self.status_message = message;
                self.stage = Stage::Processing {
                    progress_percent: progress,
                };
            }
            StatusUpdate::Succeeded {
                message,
                video_url,
                cover_image_url,
            } => {
                self.status_message = message;
                self.stage = Stage::Succeeded {
                    video_url,
                    cover_image_url,
                };
            }
            StatusUpdate::Failed { message } => self.fail(FailureKind::Server, message),
        }
    }

    pub(crate) fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        let message = message.into();
        self.status_message = message.clone();
        self.stage = Stage::Failed {
            kind,
            error_message: message,
        };
    }
}

/// Read-only copy of the session handed to rendering layers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub session: GenerationSession,
}

impl std::ops::Deref for SessionSnapshot {
    type Target = GenerationSession;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}
