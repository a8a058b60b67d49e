//! Backend access for authentication, the user's dashboard data and meeting
//! analysis.
//!
//! The traits are the seam the controller and upload workflow depend on;
//! `HttpGateway` is the reqwest implementation against the real backend.

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::session::Credential;
use crate::upload::AudioFile;

pub mod http;
pub mod schemas;

#[cfg(test)]
mod tests;

pub use http::HttpGateway;
pub use schemas::{ActionItem, AnalysisResult, MeetingInfo, Task, TaskStatus, UserProfile};

pub const TOKEN_PATH: &str = "/token";
pub const PROFILE_PATH: &str = "/users/me";
pub const TASKS_PATH: &str = "/users/me/tasks";
pub const PROCESS_AUDIO_PATH: &str = "/process-audio/";
pub const PROCESS_MEETING_PATH: &str = "/process-meeting/";

/// Credential exchange and authenticated reads.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange username/password for an access token. Any rejection is
    /// `InvalidCredentials`, whichever field was wrong.
    async fn authenticate(&self, username: &str, password: &str) -> ClientResult<String>;

    /// Any failure is `AuthExpired`.
    async fn fetch_profile(&self, credential: &Credential) -> ClientResult<UserProfile>;

    /// Any failure is `AuthExpired`. Order is preserved as returned.
    async fn fetch_tasks(&self, credential: &Credential) -> ClientResult<Vec<Task>>;
}

/// Where an analysis request goes and with what authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisTarget {
    /// `POST /process-audio/`, no session involved.
    Stateless,
    /// `POST /process-meeting/`, results are stored against the user.
    Meeting(Credential),
}

impl AnalysisTarget {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Stateless => PROCESS_AUDIO_PATH,
            Self::Meeting(_) => PROCESS_MEETING_PATH,
        }
    }
}

/// Audio submission for minutes and action items.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Any failure is `UploadFailed`. `Ok(None)` means the backend accepted
    /// the recording without returning results inline.
    async fn analyze(
        &self,
        file: AudioFile,
        target: &AnalysisTarget,
    ) -> ClientResult<Option<AnalysisResult>>;
}
