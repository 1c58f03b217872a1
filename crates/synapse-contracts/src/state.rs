//! The shared state threaded through one pipeline run.
//!
//! Exactly one `SharedState` exists per run. The pipeline hands it from node
//! to node; the agent holding it is its only reader and writer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskStatus};

/// Open-ended metadata attached to messages and memory records.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Identifier of a registered agent. Unique within one pipeline.
///
/// Example: AgentId("Triage_Node")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One agent's output for a run.
///
/// Immutable once built. The same message is appended to
/// `SharedState::messages` and handed to the event publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent_id: AgentId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl AgentMessage {
    /// Build a message stamped with the current UTC time and no metadata.
    pub fn new(agent_id: AgentId, content: impl Into<String>) -> Self {
        Self {
            agent_id,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Context key an agent sets once it has completed its turn.
///
/// Format: `<agent_id>_completed`.
pub fn completion_key(agent_id: &AgentId) -> String {
    format!("{}_completed", agent_id.0)
}

/// The single mutable record for one run.
///
/// `context` is deliberately open-ended: the pipeline only ever writes the
/// completion flags (see [`completion_key`]), but agents may use other keys
/// for inter-agent signalling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedState {
    pub task: Task,
    /// Append-only; insertion order is causal order.
    pub messages: Vec<AgentMessage>,
    pub context: BTreeMap<String, serde_json::Value>,
}

impl SharedState {
    /// Fresh state for `task` with no messages and an empty context.
    pub fn new(task: Task) -> Self {
        Self {
            task,
            messages: Vec::new(),
            context: BTreeMap::new(),
        }
    }

    pub fn original_query(&self) -> &str {
        &self.task.original_query
    }

    /// Record a completed agent turn: append its message and set its
    /// completion flag.
    pub fn commit(&mut self, message: AgentMessage) {
        let key = completion_key(&message.agent_id);
        self.messages.push(message);
        self.context.insert(key, serde_json::Value::Bool(true));
    }

    /// True when `agent_id` has committed a turn in this run.
    pub fn is_completed(&self, agent_id: &AgentId) -> bool {
        matches!(
            self.context.get(&completion_key(agent_id)),
            Some(serde_json::Value::Bool(true))
        )
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.task.status = status;
    }
}
