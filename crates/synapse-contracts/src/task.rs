//! Task identity and lifecycle status.

use serde::{Deserialize, Serialize};

/// Opaque identifier for a single pipeline run.
///
/// Callers may supply their own identifier; otherwise a UUID v4 is generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new, unique task ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of a task. Only the pipeline moves a task out of `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Processing,
    Done,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The unit of work a pipeline run operates on.
///
/// Created once per run. Everything except `status` is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub original_query: String,
    pub status: TaskStatus,
}

impl Task {
    /// Create a task in the `Processing` state.
    ///
    /// When `task_id` is `None` a fresh identifier is generated.
    pub fn new(task_id: Option<TaskId>, original_query: impl Into<String>) -> Self {
        Self {
            task_id: task_id.unwrap_or_default(),
            original_query: original_query.into(),
            status: TaskStatus::Processing,
        }
    }
}
