//! Async job state machine.
//!
//! One job per submit: Submitted -> Polling -> {Completed | Failed |
//! TimedOut}. Transitions are monotonic and terminal states absorb. A
//! flaky poll is a skipped tick, never a job failure; only an explicit
//! provider "failed" status or an exhausted poll budget ends a job
//! unsuccessfully.

use std::sync::Arc;

use crate::client::ProviderClient;
use crate::extract;
use crate::relay::FrameSink;
use crate::traits::ArtifactStore;
use crate::types::{ArtifactLocation, ArtifactRecord, GenerationRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

impl JobState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider-side long-running task, advanced only by the polling loop.
#[derive(Debug, Clone)]
pub struct AsyncJob {
    pub job_id: String,
    pub state: JobState,
    pub attempts: u32,
    pub progress_percent: u8,
    pub artifact_url: Option<String>,
    pub last_error: Option<String>,
}

impl AsyncJob {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            state: JobState::Submitted,
            attempts: 0,
            progress_percent: 0,
            artifact_url: None,
            last_error: None,
        }
    }

    pub fn begin_polling(&mut self) {
        if self.state == JobState::Submitted {
            self.state = JobState::Polling;
        }
    }

    pub fn complete(&mut self, url: impl Into<String>) {
        if self.state.is_terminal() {
            return;
        }
        self.progress_percent = 100;
        self.artifact_url = Some(url.into());
        self.state = JobState::Completed;
    }

    pub fn fail(&mut self, detail: impl Into<String>) {
        if self.state.is_terminal() {
            return;
        }
        self.last_error = Some(detail.into());
        self.state = JobState::Failed;
    }

    pub fn time_out(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = JobState::TimedOut;
    }
}

/// One unit on the progress stream. A terminal frame closes the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressFrame {
    pub text: String,
    pub is_terminal: bool,
}

impl ProgressFrame {
    pub fn progress(status: &str, percent: u8) -> Self {
        Self {
            text: format!("Status: {status} (Progress: {percent}%)"),
            is_terminal: false,
        }
    }

    pub fn completed(url: &str) -> Self {
        Self {
            text: format!("\n\n[Download Video]({url})"),
            is_terminal: true,
        }
    }

    pub fn failed(detail: Option<&str>) -> Self {
        let text = match detail {
            Some(detail) => format!("\n\nError: Video generation failed: {detail}"),
            None => "\n\nError: Video generation failed.".to_string(),
        };
        Self {
            text,
            is_terminal: true,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            text: "\n\nError: Video generation timed out.".to_string(),
            is_terminal: true,
        }
    }
}

/// Drives one submitted job to a terminal state, feeding the relay.
pub struct JobDriver {
    client: Arc<ProviderClient>,
    store: Arc<dyn ArtifactStore>,
}

impl JobDriver {
    pub fn new(client: Arc<ProviderClient>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { client, store }
    }

    /// Poll until terminal or out of budget. Every tick emits at most one
    /// frame, in tick order; exactly one terminal frame is emitted per
    /// job. Returns the job in its terminal state.
    pub async fn run(
        &self,
        mut job: AsyncJob,
        request: GenerationRequest,
        mut sink: FrameSink,
    ) -> AsyncJob {
        let max_attempts = self.client.config().max_poll_attempts;
        let interval = self.client.config().poll_interval;

        job.begin_polling();
        while job.attempts < max_attempts && !job.state.is_terminal() {
            job.attempts += 1;
            match self.client.poll_job_status(&job.job_id).await {
                Ok(payload) => self.apply_tick(&mut job, &request, &payload, &mut sink).await,
                Err(error) => {
                    tracing::warn!(job_id = %job.job_id, %error, "poll tick failed; skipping");
                }
            }
            if !job.state.is_terminal() {
                tokio::time::sleep(interval).await;
            }
        }

        if !job.state.is_terminal() {
            tracing::warn!(
                job_id = %job.job_id,
                attempts = job.attempts,
                "poll budget exhausted"
            );
            sink.send(ProgressFrame::timed_out());
            job.time_out();
        }
        job
    }

    async fn apply_tick(
        &self,
        job: &mut AsyncJob,
        request: &GenerationRequest,
        payload: &serde_json::Value,
        sink: &mut FrameSink,
    ) {
        let status = payload
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");

        match status {
            "completed" | "succeeded" => {
                let url = match extract::extract_job_artifact_url(payload) {
                    Some(url) => Some(url),
                    None => self.content_fallback(&job.job_id).await,
                };
                match url {
                    Some(url) => {
                        sink.send(ProgressFrame::completed(&url));
                        self.persist(request, &url).await;
                        job.complete(url);
                    }
                    None => {
                        let detail = "job completed without an artifact location";
                        sink.send(ProgressFrame::failed(Some(detail)));
                        job.fail(detail);
                    }
                }
            }
            "failed" => {
                let detail = failure_detail(payload);
                sink.send(ProgressFrame::failed(detail.as_deref()));
                job.fail(detail.unwrap_or_else(|| "provider reported failure".to_string()));
            }
            other => {
                let percent = progress_percent(payload);
                tracing::debug!(job_id = %job.job_id, status = other, percent, "job progress");
                sink.send(ProgressFrame::progress(other, percent));
                job.progress_percent = percent;
            }
        }
    }

    async fn content_fallback(&self, job_id: &str) -> Option<String> {
        match self.client.fetch_job_content(job_id).await {
            Ok(content) => extract::extract_job_artifact_url(&content),
            Err(error) => {
                tracing::warn!(job_id, %error, "content fallback failed");
                None
            }
        }
    }

    async fn persist(&self, request: &GenerationRequest, url: &str) {
        let record = ArtifactRecord::new(
            request.caller_id.clone(),
            &request.prompt,
            &request.model_id,
            ArtifactLocation::Url(url.to_string()),
        );
        if let Err(error) = self.store.persist_artifact(record).await {
            // The terminal frame is already out; storage trouble stays a
            // background concern.
            tracing::error!(%error, "failed to persist artifact record");
        }
    }
}

fn progress_percent(payload: &serde_json::Value) -> u8 {
    let raw = match payload.get("progress") {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    raw.clamp(0.0, 100.0) as u8
}

fn failure_detail(payload: &serde_json::Value) -> Option<String> {
    const PROBES: &[&str] = &["/error/message", "/error", "/failure_reason"];
    PROBES
        .iter()
        .find_map(|probe| payload.pointer(probe).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_absorb() {
        let mut job = AsyncJob::new("task-1");
        job.begin_polling();
        job.complete("http://vid.mp4");
        assert_eq!(job.state, JobState::Completed);

        job.fail("late failure");
        job.time_out();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.artifact_url.as_deref(), Some("http://vid.mp4"));
        assert!(job.last_error.is_none());
    }

    #[test]
    fn progress_frame_wire_text() {
        let frame = ProgressFrame::progress("in_progress", 42);
        assert_eq!(frame.text, "Status: in_progress (Progress: 42%)");
        assert!(!frame.is_terminal);

        let done = ProgressFrame::completed("http://vid.mp4");
        assert_eq!(done.text, "\n\n[Download Video](http://vid.mp4)");
        assert!(done.is_terminal);
    }

    #[test]
    fn timeout_frame_is_distinguishable_from_failure() {
        assert_ne!(ProgressFrame::timed_out().text, ProgressFrame::failed(None).text);
        assert!(ProgressFrame::timed_out().text.contains("timed out"));
    }

    #[test]
    fn progress_percent_tolerates_shapes() {
        assert_eq!(progress_percent(&serde_json::json!({ "progress": 37 })), 37);
        assert_eq!(progress_percent(&serde_json::json!({ "progress": "58%" })), 58);
        assert_eq!(progress_percent(&serde_json::json!({ "progress": 250 })), 100);
        assert_eq!(progress_percent(&serde_json::json!({})), 0);
    }

    #[test]
    fn failure_detail_prefers_structured_error() {
        let payload = serde_json::json!({ "status": "failed", "error": { "message": "nsfw" } });
        assert_eq!(failure_detail(&payload).as_deref(), Some("nsfw"));
        assert_eq!(failure_detail(&serde_json::json!({ "status": "failed" })), None);
    }
}
