//! Error kinds surfaced by the session and upload workflow.
//!
//! Transport failures, HTTP error statuses and malformed payloads are all
//! normalised into one of these at the gateway boundary. Nothing above the
//! gateway sees raw transport detail.

use thiserror::Error;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password.";
pub const UPLOAD_FAILED_MESSAGE: &str = "Error processing meeting.";
pub const NO_FILE_SELECTED_MESSAGE: &str = "Please select a file first.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Token exchange rejected. Never says which field was wrong.
    #[error("Invalid username or password.")]
    InvalidCredentials,
    /// An authenticated request was refused; handled by forcing logout.
    #[error("Session expired, please log in again.")]
    AuthExpired,
    /// Any failure while submitting audio for analysis.
    #[error("Error processing meeting.")]
    UploadFailed,
    /// Local-only rejection; never reaches the network.
    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::AuthExpired => "auth_expired",
            Self::UploadFailed => "upload_failed",
            Self::Validation(_) => "validation",
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
