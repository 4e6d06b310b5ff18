use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{FrameRate, GenerationRequest, Quality, TaskId, VideoSize};

pub const DEFAULT_SERVER_FAILURE_MESSAGE: &str = "Video generation failed";
pub const MISSING_VIDEO_URL_MESSAGE: &str = "Video generation finished without a video URL";

/// Body of `POST /generate-video`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateVideoRequest {
    pub prompt: String,
    pub model: String,
    pub quality: Quality,
    pub with_audio: bool,
    pub size: VideoSize,
    pub fps: FrameRate,
}

impl From<&GenerationRequest> for GenerateVideoRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            prompt: request.prompt.clone(),
            model: request.settings.model.clone(),
            quality: request.settings.quality,
            with_audio: request.settings.with_audio,
            size: request.settings.size,
            fps: request.settings.fps,
        }
    }
}

/// Create response in either shape: `{taskId, queuePosition}` from task-queue
/// servers or `{id}` from the synchronous-id proxy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateVideoResponse {
    #[serde(default, rename = "taskId", deserialize_with = "opt_string_or_number")]
    pub task_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default, rename = "queuePosition")]
    pub queue_position: Option<u32>,
    #[serde(default, rename = "queue_position")]
    pub queue_position_snake: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GenerateVideoResponse {
    /// `taskId` wins over `id`; empty identifiers count as missing.
    pub fn task_id(&self) -> Option<TaskId> {
        [self.task_id.as_deref(), self.id.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|id| !id.is_empty())
            .map(|id| TaskId(id.to_string()))
    }

    /// Phase the session enters right after the task was accepted. Only
    /// `processing` moves straight to Processing; everything else is queued.
    pub fn initial_update(&self) -> StatusUpdate {
        let queue_position = self.queue_position.or(self.queue_position_snake);
        let message = self.message.clone().filter(|m| !m.trim().is_empty());
        match normalized(self.status.as_deref()).as_deref() {
            Some("processing") => StatusUpdate::Processing {
                message: message.unwrap_or_else(|| "Generating video".to_string()),
                progress: None,
            },
            _ => StatusUpdate::Queued {
                message: message.unwrap_or_else(|| queued_message(queue_position)),
                queue_position,
            },
        }
    }
}

/// Body of `POST /check-video-result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckVideoResultRequest {
    pub id: String,
}

/// Status check response. Task-queue servers send camelCase fields and the
/// synchronous-id proxy sends snake_case ones. Each spelling is its own field
/// so a body carrying both still decodes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub task_status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default, rename = "videoUrl")]
    pub video_url_camel: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default, rename = "coverImageUrl")]
    pub cover_image_url_camel: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub queue_position: Option<u32>,
    #[serde(default, rename = "queuePosition")]
    pub queue_position_camel: Option<u32>,
}

/// A status response reduced to exactly one of the four outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Queued {
        message: String,
        queue_position: Option<u32>,
    },
    Processing {
        message: String,
        progress: Option<u8>,
    },
    Succeeded {
        message: String,
        video_url: String,
        cover_image_url: Option<String>,
    },
    Failed {
        message: String,
    },
}

impl StatusUpdate {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

impl StatusResponse {
    pub fn classify(self) -> StatusUpdate {
        let video_url = non_empty(self.video_url_camel).or(non_empty(self.video_url));
        let cover_image_url =
            non_empty(self.cover_image_url_camel).or(non_empty(self.cover_image_url));
        let queue_position = self.queue_position.or(self.queue_position_camel);
        let error = non_empty(self.error);
        let message = non_empty(self.message);
        // The proxy pairs `task_status` with a fixed "in progress" note, so its
        // message says nothing about a failure.
        let explicit = normalized(self.status.as_deref());
        let failure_message = match explicit {
            Some(_) => error.clone().or_else(|| message.clone()),
            None => error.clone(),
        };
        let status = explicit.or_else(|| normalized(self.task_status.as_deref()));

        let Some(status) = status else {
            // The proxy omits a status on success and only reports the url.
            return match video_url {
                Some(video_url) => StatusUpdate::Succeeded {
                    message: message.unwrap_or_else(|| "Video generation successful".to_string()),
                    video_url,
                    cover_image_url,
                },
                None => StatusUpdate::Failed {
                    message: error
                        .or(message)
                        .unwrap_or_else(|| DEFAULT_SERVER_FAILURE_MESSAGE.to_string()),
                },
            };
        };

        match status.as_str() {
            "success" | "succeeded" => match video_url {
                Some(video_url) => StatusUpdate::Succeeded {
                    message: message.unwrap_or_else(|| "Video generation successful".to_string()),
                    video_url,
                    cover_image_url,
                },
                None => StatusUpdate::Failed {
                    message: MISSING_VIDEO_URL_MESSAGE.to_string(),
                },
            },
            "processing" => StatusUpdate::Processing {
                message: message.unwrap_or_else(|| "Generating video".to_string()),
                progress: self.progress.and_then(clamp_progress),
            },
            "queued" => StatusUpdate::Queued {
                message: message.unwrap_or_else(|| queued_message(queue_position)),
                queue_position,
            },
            _ => StatusUpdate::Failed {
                message: failure_message
                    .unwrap_or_else(|| DEFAULT_SERVER_FAILURE_MESSAGE.to_string()),
            },
        }
    }
}

fn queued_message(position: Option<u32>) -> String {
    match position {
        Some(position) => format!("Waiting in queue (position {position})"),
        None => "Waiting in queue".to_string(),
    }
}

fn normalized(status: Option<&str>) -> Option<String> {
    status
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn clamp_progress(raw: f64) -> Option<u8> {
    if raw.is_nan() {
        return None;
    }
    Some(raw.clamp(0.0, 100.0).round() as u8)
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
