//! Client-side lifecycle of a text-to-video generation request: submit a
//! prompt, poll the task until it resolves, expose the result to renderers.

pub mod api;
pub mod controller;
pub mod error;
pub mod session;

pub use api::{ApiFlavor, HttpVideoApi, VideoApi};
pub use controller::{
    wait_for_terminal, ControllerConfig, GenerationController, SessionEvent, POLL_FAILED_MESSAGE,
    SUBMIT_FAILED_MESSAGE,
};
pub use error::{ApiCallError, ControllerError};
pub use session::{FailureKind, GenerationSession, Phase, SessionSnapshot, Stage};
