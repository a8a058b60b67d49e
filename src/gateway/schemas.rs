//! Explicit response schemas for each backend endpoint.
//!
//! Payloads are parsed here and nowhere else; anything that does not fit is
//! rejected at the gateway instead of leaking into rendering.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// `POST /token`
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub token_type: Option<String>,
}

/// `GET /users/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub disabled: Option<bool>,
    /// Identity attributes this client does not interpret.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            full_name: None,
            disabled: None,
            attributes: BTreeMap::new(),
        }
    }
}

/// Workflow status of a stored task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Other(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "to do" | "todo" | "open" => Self::Pending,
            "in progress" | "in_progress" | "doing" => Self::InProgress,
            "done" | "completed" | "complete" | "closed" => Self::Done,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| Self::parse(&s)).unwrap_or(Self::Pending))
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One entry of `GET /users/me/tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub description: String,
    #[serde(rename = "due_date_str", alias = "due_date", default, deserialize_with = "display_string")]
    pub due_date: String,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default)]
    pub meeting_id: Option<i64>,
    #[serde(default)]
    pub is_locked: Option<bool>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

/// Ids must be unique within one fetch.
pub fn find_duplicate_task_id(tasks: &[Task]) -> Option<i64> {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks.iter().map(|t| t.id).find(|id| !seen.insert(*id))
}

/// Action item extracted from a meeting recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(default, deserialize_with = "display_string")]
    pub task_description: String,
    #[serde(default, deserialize_with = "display_string")]
    pub assignee: String,
    #[serde(default, deserialize_with = "display_string")]
    pub due_date: String,
}

/// Minutes and action items produced by one successful analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub minutes: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<ActionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingInfo {
    pub id: i64,
    #[serde(default)]
    pub filename: Option<String>,
}

/// `POST /process-audio/` (and `/process-meeting/` when it returns results).
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisEnvelope {
    #[serde(default)]
    pub meeting_info: Option<MeetingInfo>,
    pub results: AnalysisResult,
}

/// Accept strings, numbers, booleans or null and keep a display string.
fn display_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a scalar, found {}",
                other
            )))
        }
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
