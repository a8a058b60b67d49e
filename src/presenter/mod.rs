//! Pure projections of domain data into renderable view models.
//!
//! Nothing in here touches the network or holds state; the same input always
//! gives the same view. `Display` impls produce the plain-text rendering used
//! by the terminal front-end.

use std::fmt;

use crate::gateway::{AnalysisResult, Task, UserProfile};
use crate::upload::{UploadMode, UploadPhase, UploadState};

pub const NO_SUMMARY_TEXT: &str = "No summary was generated.";
pub const NO_ACTION_ITEMS_TEXT: &str = "No action items were identified.";
pub const NO_TASKS_TEXT: &str = "You have no assigned tasks.";
pub const PROCESSING_TEXT: &str = "Processing meeting... this may take a moment.";
pub const MEETING_PROCESSED_TEXT: &str =
    "Meeting processed successfully! Your task list has been refreshed.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionItemView {
    pub description: String,
    pub assignee: String,
    pub due_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisView {
    /// Minutes text, or the fallback when the analysis produced none.
    pub summary: String,
    pub items: Vec<ActionItemView>,
    /// Shown instead of the list when `items` is empty.
    pub empty_items_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: i64,
    pub description: String,
    pub due_date: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListView {
    pub items: Vec<TaskView>,
    pub empty_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub greeting: String,
    pub username: Option<String>,
    pub tasks: TaskListView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadView {
    pub phase: UploadPhase,
    pub busy: bool,
    pub file_name: Option<String>,
    pub message: Option<String>,
    pub analysis: Option<AnalysisView>,
}

/// No result, no view: nothing is rendered, not even a placeholder.
pub fn present_analysis(result: Option<&AnalysisResult>) -> Option<AnalysisView> {
    let result = result?;

    let summary = result
        .minutes
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(NO_SUMMARY_TEXT)
        .to_string();

    let items: Vec<ActionItemView> = result
        .tasks
        .iter()
        .map(|item| ActionItemView {
            description: item.task_description.clone(),
            assignee: item.assignee.clone(),
            due_date: item.due_date.clone(),
        })
        .collect();

    let empty_items_text = items.is_empty().then(|| NO_ACTION_ITEMS_TEXT.to_string());

    Some(AnalysisView {
        summary,
        items,
        empty_items_text,
    })
}

pub fn present_tasks(tasks: &[Task]) -> TaskListView {
    let items: Vec<TaskView> = tasks
        .iter()
        .map(|task| TaskView {
            id: task.id,
            description: task.description.clone(),
            due_date: task.due_date.clone(),
            status: task.status.to_string(),
        })
        .collect();

    let empty_text = items.is_empty().then(|| NO_TASKS_TEXT.to_string());

    TaskListView { items, empty_text }
}

pub fn present_dashboard(profile: Option<&UserProfile>, tasks: &[Task]) -> DashboardView {
    let username = profile.map(|p| p.username.clone());
    let greeting = format!("Welcome, {}!", username.as_deref().unwrap_or("..."));

    DashboardView {
        greeting,
        username,
        tasks: present_tasks(tasks),
    }
}

pub fn present_upload(state: &UploadState, mode: UploadMode) -> UploadView {
    let message = match state.phase {
        UploadPhase::Submitting => Some(PROCESSING_TEXT.to_string()),
        UploadPhase::Succeeded if mode == UploadMode::Session && state.result.is_none() => {
            Some(MEETING_PROCESSED_TEXT.to_string())
        }
        _ => state.error_message.clone(),
    };

    UploadView {
        phase: state.phase,
        busy: state.phase == UploadPhase::Submitting,
        file_name: state.file_name.clone(),
        message,
        analysis: present_analysis(state.result.as_ref()),
    }
}

impl fmt::Display for AnalysisView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Minutes of Meeting")?;
        writeln!(f, "{}", self.summary)?;
        writeln!(f)?;
        writeln!(f, "Action Items")?;
        if let Some(empty) = &self.empty_items_text {
            return writeln!(f, "{}", empty);
        }
        for item in &self.items {
            writeln!(
                f,
                "- {} (Assignee: {}, Due: {})",
                item.description, item.assignee, item.due_date
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for TaskListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(empty) = &self.empty_text {
            return writeln!(f, "{}", empty);
        }
        for task in &self.items {
            writeln!(
                f,
                "#{} {} (Due: {}, Status: {})",
                task.id, task.description, task.due_date, task.status
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.greeting)?;
        writeln!(f)?;
        writeln!(f, "Your Action Items")?;
        write!(f, "{}", self.tasks)
    }
}

impl fmt::Display for UploadView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            writeln!(f, "{}", message)?;
        }
        if let Some(analysis) = &self.analysis {
            write!(f, "{}", analysis)?;
        }
        Ok(())
    }
}
