use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use shared::{
    domain::{GenerationRequest, GenerationSettings, TaskId},
    protocol::GenerateVideoRequest,
};
use tokio::{
    sync::{broadcast, Mutex, MutexGuard},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    api::VideoApi,
    error::{ApiCallError, ControllerError},
    session::{FailureKind, GenerationSession, Phase, SessionSnapshot},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to start video generation";
pub const POLL_FAILED_MESSAGE: &str = "Error retrieving video status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Delay between the end of one status check and the start of the next.
    pub poll_interval: Duration,
    /// Upper bound for every call against the service.
    pub request_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Updated(SessionSnapshot),
}

struct ControllerState {
    /// Bumped by every submit and reset. Work tagged with an older epoch
    /// must not touch the session.
    epoch: u64,
    revision: u64,
    updated_at: chrono::DateTime<Utc>,
    session: GenerationSession,
    poll_task: Option<JoinHandle<()>>,
}

impl ControllerState {
    fn supersede(&mut self) -> u64 {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        self.epoch += 1;
        self.epoch
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            revision: self.revision,
            updated_at: self.updated_at,
            session: self.session.clone(),
        }
    }
}

/// Owns the lifecycle of the single live generation session.
pub struct GenerationController {
    api: Arc<dyn VideoApi>,
    config: ControllerConfig,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<SessionEvent>,
}

impl GenerationController {
    pub fn new(api: Arc<dyn VideoApi>, config: ControllerConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            api,
            config,
            inner: Mutex::new(ControllerState {
                epoch: 0,
                revision: 0,
                updated_at: Utc::now(),
                session: GenerationSession::default(),
                poll_task: None,
            }),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot()
    }

    /// True while a poll loop for the live session has not finished.
    pub async fn is_polling(&self) -> bool {
        let guard = self.inner.lock().await;
        guard
            .poll_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Starts a new generation, replacing whatever session was live.
    ///
    /// Blank prompts are rejected without touching the session. Every other
    /// outcome, including transport failures, is reflected in the returned
    /// snapshot.
    pub async fn submit(
        self: &Arc<Self>,
        prompt: &str,
        settings: GenerationSettings,
    ) -> Result<SessionSnapshot, ControllerError> {
        let Some(request) = GenerationRequest::new(prompt, settings) else {
            debug!("ignoring submit with blank prompt");
            return Err(ControllerError::BlankPrompt);
        };

        let epoch = {
            let mut guard = self.inner.lock().await;
            let epoch = guard.supersede();
            guard.session = GenerationSession::submitting();
            self.publish(&mut guard);
            epoch
        };
        info!(
            epoch,
            model = %request.settings.model,
            size = request.settings.size.as_str(),
            "submitting generation request"
        );

        let body = GenerateVideoRequest::from(&request);
        let outcome = self.bounded(self.api.create_task(&body)).await;

        let mut guard = self.inner.lock().await;
        if guard.epoch != epoch {
            debug!(epoch, "discarding create response for superseded session");
            return Ok(guard.snapshot());
        }

        match outcome {
            Ok(response) => match response.task_id() {
                Some(task_id) => {
                    guard.session.accept(task_id.clone(), response.initial_update());
                    info!(
                        task_id = %task_id,
                        phase = ?guard.session.phase(),
                        queue_position = ?guard.session.queue_position(),
                        "generation task accepted"
                    );
                    self.publish(&mut guard);
                    guard.poll_task = Some(self.spawn_poll_loop(epoch, task_id));
                }
                None => {
                    warn!(?response, "create response carried no task identifier");
                    guard.session.fail(FailureKind::Submission, SUBMIT_FAILED_MESSAGE);
                    self.publish(&mut guard);
                }
            },
            Err(err) => {
                warn!(error = %err, "failed to create generation task");
                guard.session.fail(FailureKind::Submission, SUBMIT_FAILED_MESSAGE);
                self.publish(&mut guard);
            }
        }

        Ok(guard.snapshot())
    }

    /// Drops the live session and cancels its polling. Safe to call repeatedly.
    pub async fn reset(&self) -> SessionSnapshot {
        let mut guard = self.inner.lock().await;
        guard.supersede();
        if guard.session != GenerationSession::default() {
            guard.session = GenerationSession::default();
            info!("generation session reset");
            self.publish(&mut guard);
        }
        guard.snapshot()
    }

    fn spawn_poll_loop(self: &Arc<Self>, epoch: u64, task_id: TaskId) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.run_poll_loop(epoch, task_id).await })
    }

    async fn run_poll_loop(&self, epoch: u64, task_id: TaskId) {
        loop {
            // Chained ticks: the next wait starts only once the previous call resolved.
            tokio::time::sleep(self.config.poll_interval).await;
            debug!(task_id = %task_id, epoch, "poll tick");

            let outcome = self.bounded(self.api.check_status(&task_id)).await;

            let mut guard = self.inner.lock().await;
            if guard.epoch != epoch {
                debug!(task_id = %task_id, epoch, "stopping poll loop for superseded session");
                return;
            }

            match outcome {
                Ok(response) => {
                    let update = response.classify();
                    let terminal = update.is_terminal();
                    guard.session.apply(update);
                    match guard.session.phase() {
                        Phase::Succeeded => info!(
                            task_id = %task_id,
                            video_url = guard.session.video_url().unwrap_or_default(),
                            "generation succeeded"
                        ),
                        Phase::Failed => warn!(
                            task_id = %task_id,
                            error = guard.session.error_message().unwrap_or_default(),
                            "generation failed on server"
                        ),
                        phase => debug!(
                            task_id = %task_id,
                            ?phase,
                            progress = ?guard.session.progress_percent(),
                            queue_position = ?guard.session.queue_position(),
                            "generation pending"
                        ),
                    }
                    self.publish(&mut guard);
                    if terminal {
                        guard.poll_task = None;
                        return;
                    }
                }
                Err(err) => {
                    warn!(task_id = %task_id, error = %err, "status check failed");
                    guard.session.fail(FailureKind::Polling, POLL_FAILED_MESSAGE);
                    self.publish(&mut guard);
                    guard.poll_task = None;
                    return;
                }
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ApiCallError>>,
    ) -> Result<T, ApiCallError> {
        tokio::time::timeout(self.config.request_timeout, call)
            .await
            .map_err(|_| ApiCallError::Timeout(self.config.request_timeout))?
    }

    fn publish(&self, guard: &mut MutexGuard<'_, ControllerState>) {
        guard.revision += 1;
        guard.updated_at = Utc::now();
        // No subscribers is fine; rendering layers come and go.
        let _ = self.events.send(SessionEvent::Updated(guard.snapshot()));
    }
}

/// Consumes events until the session reaches Succeeded or Failed, handing
/// every snapshot to `on_update` on the way. Returns `None` if the controller
/// went away first.
pub async fn wait_for_terminal(
    events: &mut broadcast::Receiver<SessionEvent>,
    mut on_update: impl FnMut(&SessionSnapshot),
) -> Option<SessionSnapshot> {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Updated(snapshot)) => {
                on_update(&snapshot);
                if snapshot.is_terminal() {
                    return Some(snapshot);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "session event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
