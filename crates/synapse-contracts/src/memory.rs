//! Long-term memory records.

use serde::{Deserialize, Serialize};

use crate::state::{AgentId, Metadata};

/// Returned by `recall` when nothing relevant is stored.
pub const NO_EXPERIENCES_FOUND: &str = "No relevant past experiences found.";

/// Joins recalled records, most similar first.
pub const RECALL_SEPARATOR: &str = "\n---\n";

/// Default number of records recalled per agent turn.
pub const DEFAULT_RECALL_K: usize = 3;

/// One remembered interaction. Written once, never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub agent_id: AgentId,
    pub query: String,
    pub solution: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl MemoryRecord {
    pub fn new(agent_id: AgentId, query: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            agent_id,
            query: query.into(),
            solution: solution.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The text a backend indexes and returns from recall.
    pub fn content(&self) -> String {
        format!("Query: {}\nSolution: {}", self.query, self.solution)
    }

    /// Caller metadata plus the `agent_id` and `type` tags every stored
    /// record carries.
    pub fn tagged_metadata(&self) -> Metadata {
        let mut meta = self.metadata.clone();
        meta.insert(
            "agent_id".to_string(),
            serde_json::Value::String(self.agent_id.0.clone()),
        );
        meta.insert(
            "type".to_string(),
            serde_json::Value::String("success_record".to_string()),
        );
        meta
    }
}
