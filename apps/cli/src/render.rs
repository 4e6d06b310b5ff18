use client_core::{Phase, SessionSnapshot};

/// One human-readable status line per snapshot.
pub fn describe(snapshot: &SessionSnapshot) -> String {
    let message = snapshot.status_message();
    match snapshot.phase() {
        Phase::Idle => "idle".to_string(),
        Phase::Submitting => "submitting prompt...".to_string(),
        Phase::Queued => match snapshot.queue_position() {
            Some(position) => format!("queued (position {position}): {message}"),
            None => format!("queued: {message}"),
        },
        Phase::Processing => match snapshot.progress_percent() {
            Some(progress) => format!("processing {progress}%: {message}"),
            None => format!("processing: {message}"),
        },
        Phase::Succeeded => {
            let mut line = format!("video ready: {}", snapshot.video_url().unwrap_or_default());
            if let Some(cover) = snapshot.cover_image_url() {
                line.push_str(&format!("\ncover image: {cover}"));
            }
            line
        }
        Phase::Failed => format!(
            "generation failed: {}",
            snapshot.error_message().unwrap_or(message)
        ),
    }
}

/// Prints snapshots either as text lines (skipping repeats) or as JSON lines.
pub struct Renderer {
    json: bool,
    last_line: Option<String>,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            last_line: None,
        }
    }

    pub fn render(&mut self, snapshot: &SessionSnapshot) {
        if let Some(line) = self.next_line(snapshot) {
            println!("{line}");
        }
    }

    fn next_line(&mut self, snapshot: &SessionSnapshot) -> Option<String> {
        let line = if self.json {
            match serde_json::to_string(snapshot) {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize session snapshot");
                    return None;
                }
            }
        } else {
            describe(snapshot)
        };

        if !self.json && self.last_line.as_deref() == Some(line.as_str()) {
            return None;
        }
        self.last_line = Some(line.clone());
        Some(line)
    }
}
