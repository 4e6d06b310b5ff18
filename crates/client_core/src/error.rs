use std::time::Duration;

use thiserror::Error;

/// Failure of a single call against the generation service. These details are
/// logged and never shown to the user verbatim.
#[derive(Debug, Error)]
pub enum ApiCallError {
    #[error("invalid service url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service responded with {status}: {detail}")]
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },
    #[error("malformed response body: {0}")]
    Decode(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("prompt must not be blank")]
    BlankPrompt,
}
