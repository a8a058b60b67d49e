use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::audio_file::AudioFile;
use crate::error::{ClientError, ClientResult, NO_FILE_SELECTED_MESSAGE, UPLOAD_FAILED_MESSAGE};
use crate::gateway::{AnalysisGateway, AnalysisResult, AnalysisTarget};
use crate::session::Credential;

pub const SUBMISSION_IN_PROGRESS_MESSAGE: &str =
    "A meeting is already being processed. Please wait for it to finish.";
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to process meetings.";

/// Phase of one audio submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Idle,
    FileSelected,
    Submitting,
    Succeeded,
    Failed,
}

impl UploadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FileSelected => "file_selected",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Which backend configuration a workflow submits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// `/process-audio/`, results shown inline.
    Anonymous,
    /// `/process-meeting/`, results stored against the logged-in user.
    Session,
}

/// Renderable snapshot of a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadState {
    pub phase: UploadPhase,
    pub file_name: Option<String>,
    pub error_message: Option<String>,
    pub result: Option<AnalysisResult>,
    pub generation: u64,
}

#[derive(Debug)]
struct WorkflowState {
    phase: UploadPhase,
    selected: Option<AudioFile>,
    error_message: Option<String>,
    result: Option<AnalysisResult>,
    generation: u64,
    submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            phase: UploadPhase::Idle,
            selected: None,
            error_message: None,
            result: None,
            generation: 0,
            submitted_at: None,
        }
    }
}

/// Ticket for the one in-flight request, tagged with its generation.
struct Submission {
    generation: u64,
    file: AudioFile,
}

#[derive(Clone)]
pub struct UploadWorkflow {
    mode: UploadMode,
    gateway: Arc<dyn AnalysisGateway>,
    timeout: Duration,
    state: Arc<Mutex<WorkflowState>>,
}

impl UploadWorkflow {
    pub fn new(mode: UploadMode, gateway: Arc<dyn AnalysisGateway>, timeout: Duration) -> Self {
        Self {
            mode,
            gateway,
            timeout,
            state: Arc::new(Mutex::new(WorkflowState::default())),
        }
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    pub async fn phase(&self) -> UploadPhase {
        self.state.lock().await.phase
    }

    pub async fn snapshot(&self) -> UploadState {
        let state = self.state.lock().await;
        UploadState {
            phase: state.phase,
            file_name: state.selected.as_ref().map(|f| f.file_name().to_string()),
            error_message: state.error_message.clone(),
            result: state.result.clone(),
            generation: state.generation,
        }
    }

    /// Pick the file for the next submission, replacing any previous pick.
    /// Rejected while a submission is in flight.
    pub async fn select_file(&self, file: AudioFile) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        if state.phase == UploadPhase::Submitting {
            warn!(
                "Ignoring selection of {} while a submission is in flight",
                file.file_name()
            );
            return Err(ClientError::validation(SUBMISSION_IN_PROGRESS_MESSAGE));
        }

        debug!("Selected {:?} for {:?} analysis", file, self.mode);
        state.phase = UploadPhase::FileSelected;
        state.selected = Some(file);
        state.error_message = None;
        Ok(())
    }

    /// Submit the selected file and wait for the outcome.
    ///
    /// Returns the phase the workflow settled in. A trigger while already
    /// Submitting is ignored and reports `Submitting` without a new request.
    pub async fn submit(&self, credential: Option<&Credential>) -> ClientResult<UploadPhase> {
        let target = match (self.mode, credential) {
            (UploadMode::Anonymous, _) => AnalysisTarget::Stateless,
            (UploadMode::Session, Some(credential)) => AnalysisTarget::Meeting(credential.clone()),
            (UploadMode::Session, None) => {
                return Err(ClientError::validation(LOGIN_REQUIRED_MESSAGE));
            }
        };

        let Some(submission) = self.begin().await? else {
            return Ok(UploadPhase::Submitting);
        };

        let outcome = match tokio::time::timeout(
            self.timeout,
            self.gateway.analyze(submission.file, &target),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "Analysis timed out after {} seconds",
                    self.timeout.as_secs_f32()
                );
                Err(ClientError::UploadFailed)
            }
        };

        Ok(self.finish(submission.generation, outcome).await)
    }

    /// Back to Idle, dropping any selection and result. A response still in
    /// flight is discarded when it lands.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        let generation = state.generation + 1;
        *state = WorkflowState {
            generation,
            ..WorkflowState::default()
        };
    }

    async fn begin(&self) -> ClientResult<Option<Submission>> {
        let mut state = self.state.lock().await;

        if state.phase == UploadPhase::Submitting {
            warn!("Submission already in flight, ignoring trigger");
            return Ok(None);
        }

        let Some(file) = state.selected.take() else {
            state.error_message = Some(NO_FILE_SELECTED_MESSAGE.to_string());
            return Err(ClientError::validation(NO_FILE_SELECTED_MESSAGE));
        };

        state.generation += 1;
        state.phase = UploadPhase::Submitting;
        state.error_message = None;
        state.result = None;
        state.submitted_at = Some(chrono::Utc::now());

        info!(
            "Submitting {} for {:?} analysis (generation {})",
            file.file_name(),
            self.mode,
            state.generation
        );

        Ok(Some(Submission {
            generation: state.generation,
            file,
        }))
    }

    async fn finish(
        &self,
        generation: u64,
        outcome: ClientResult<Option<AnalysisResult>>,
    ) -> UploadPhase {
        let mut state = self.state.lock().await;

        if state.generation != generation || state.phase != UploadPhase::Submitting {
            debug!(
                "Discarding stale analysis response (generation {}, current {})",
                generation, state.generation
            );
            return state.phase;
        }

        let elapsed = state
            .submitted_at
            .take()
            .map(|started| (chrono::Utc::now() - started).num_milliseconds())
            .unwrap_or(0);

        // The file was taken at submission, so a retry always needs a new pick
        state.selected = None;

        match outcome {
            Ok(result) => {
                info!("Analysis succeeded in {}ms", elapsed);
                state.phase = UploadPhase::Succeeded;
                state.result = result;
                state.error_message = None;
            }
            Err(e) => {
                error!("Analysis failed after {}ms: {}", elapsed, e.kind());
                state.phase = UploadPhase::Failed;
                state.result = None;
                state.error_message = Some(UPLOAD_FAILED_MESSAGE.to_string());
            }
        }

        state.phase
    }
}
