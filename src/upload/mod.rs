//! Audio submission lifecycle.
//!
//! Idle → FileSelected → Submitting → Succeeded | Failed, one outstanding
//! request per workflow, no automatic retries.

pub mod audio_file;
pub mod workflow;

pub use audio_file::{mime_type_for_name, AudioFile};
pub use workflow::{UploadMode, UploadPhase, UploadState, UploadWorkflow};
