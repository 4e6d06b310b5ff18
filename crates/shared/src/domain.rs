use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ParseSettingError;

/// Opaque identifier the remote service assigns to one generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const DEFAULT_MODEL: &str = "cogvideox-3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Quality,
    #[default]
    Speed,
}

impl Quality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Speed => "speed",
        }
    }
}

impl FromStr for Quality {
    type Err = ParseSettingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "speed" => Ok(Self::Speed),
            _ => Err(ParseSettingError::Quality(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoSize {
    #[default]
    #[serde(rename = "1920x1080")]
    FullHd,
    #[serde(rename = "3840x2160")]
    UltraHd,
}

impl VideoSize {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullHd => "1920x1080",
            Self::UltraHd => "3840x2160",
        }
    }
}

impl FromStr for VideoSize {
    type Err = ParseSettingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1920x1080" | "1080p" => Ok(Self::FullHd),
            "3840x2160" | "2160p" | "4k" => Ok(Self::UltraHd),
            _ => Err(ParseSettingError::Size(raw.to_string())),
        }
    }
}

/// Output frame rate, sent on the wire as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum FrameRate {
    #[default]
    Fps30,
    Fps60,
}

impl From<FrameRate> for u32 {
    fn from(value: FrameRate) -> Self {
        match value {
            FrameRate::Fps30 => 30,
            FrameRate::Fps60 => 60,
        }
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = ParseSettingError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            30 => Ok(Self::Fps30),
            60 => Ok(Self::Fps60),
            other => Err(ParseSettingError::Fps(other.to_string())),
        }
    }
}

impl FromStr for FrameRate {
    type Err = ParseSettingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ParseSettingError::Fps(raw.to_string()))?;
        Self::try_from(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub model: String,
    pub quality: Quality,
    pub size: VideoSize,
    pub fps: FrameRate,
    pub with_audio: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            quality: Quality::default(),
            size: VideoSize::default(),
            fps: FrameRate::default(),
            with_audio: false,
        }
    }
}

/// One submission as it leaves the client. Never mutated after sending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub settings: GenerationSettings,
}

impl GenerationRequest {
    /// Returns `None` for blank prompts. The stored prompt is trimmed.
    pub fn new(prompt: &str, settings: GenerationSettings) -> Option<Self> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        Some(Self {
            prompt: prompt.to_string(),
            settings,
        })
    }
}
