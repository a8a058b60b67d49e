use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// An audio recording picked for analysis, held in memory until submitted.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioFile {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl AudioFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type_for_name(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    /// Read a recording from disk.
    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        if !path.is_file() {
            return Err(ClientError::validation(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let bytes = fs::read(path).await.map_err(|e| {
            ClientError::validation(format!("Failed to read {}: {}", path.display(), e))
        })?;

        if bytes.is_empty() {
            return Err(ClientError::validation(format!(
                "File is empty: {}",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        debug!("Loaded {} ({} bytes)", file_name, bytes.len());
        Ok(Self::new(file_name, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// Keep multi-megabyte payloads out of debug logs.
impl fmt::Debug for AudioFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// MIME type from the file extension, falling back to octet-stream.
pub fn mime_type_for_name(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "opus" => "audio/opus",
        "weba" => "audio/webm",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for_name() {
        assert_eq!(mime_type_for_name("standup.wav"), "audio/wav");
        assert_eq!(mime_type_for_name("standup.MP3"), "audio/mpeg");
        assert_eq!(mime_type_for_name("call.m4a"), "audio/mp4");
        assert_eq!(mime_type_for_name("notes"), "application/octet-stream");
        assert_eq!(mime_type_for_name("notes.txt"), "application/octet-stream");
    }

    #[test]
    fn test_debug_omits_bytes() {
        let file = AudioFile::new("a.wav", vec![7; 4096]);
        let rendered = format!("{:?}", file);
        assert!(rendered.contains("4096"));
        assert!(!rendered.contains("7, 7"));
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standup.ogg");
        std::fs::write(&path, b"OggS....").unwrap();

        let file = AudioFile::from_path(&path).await.unwrap();
        assert_eq!(file.file_name(), "standup.ogg");
        assert_eq!(file.mime_type(), "audio/ogg");
        assert_eq!(file.len(), 8);
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let err = AudioFile::from_path(Path::new("/nonexistent/meeting.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(msg) if msg.contains("not found")));
    }

    #[tokio::test]
    async fn test_from_path_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        std::fs::write(&path, b"").unwrap();

        let err = AudioFile::from_path(&path).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(msg) if msg.contains("empty")));
    }
}
