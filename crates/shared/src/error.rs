use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body the generation service returns alongside non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceError {
    pub error: String,
}

impl ServiceError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSettingError {
    #[error("unknown quality '{0}', expected 'quality' or 'speed'")]
    Quality(String),
    #[error("unsupported size '{0}', expected 1920x1080 or 3840x2160")]
    Size(String),
    #[error("unsupported fps '{0}', expected 30 or 60")]
    Fps(String),
}
