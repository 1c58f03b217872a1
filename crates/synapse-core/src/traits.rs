//! Collaborator contracts consumed by every agent.
//!
//! - `LanguageModel` : the reasoning collaborator (the only slow step)
//! - `MemoryStore`   : similarity-keyed long-term memory
//! - `EventPublisher`: advisory, best-effort broadcast of agent output
//!
//! All three are long-lived and shared by many concurrent runs, so
//! implementations must be internally thread-safe.

use async_trait::async_trait;

use synapse_contracts::{
    error::SynapseResult, llm::ChatMessage, memory::MemoryRecord, state::AgentMessage,
};

/// A chat-completion style language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send the ordered prompt and return the model's text response.
    ///
    /// Fails with `ModelUnavailable` when the model cannot be reached and
    /// `ModelError` when it answers with an error. Dropping the returned
    /// future cancels the call.
    async fn invoke(&self, messages: &[ChatMessage]) -> SynapseResult<String>;
}

/// Long-term memory keyed by semantic similarity.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Return the content of the `k` stored records most similar to `query`,
    /// most similar first, joined by `RECALL_SEPARATOR`.
    ///
    /// An empty store, or one where no record clears the backend's threshold,
    /// is a normal state: return `NO_EXPERIENCES_FOUND`, not an error.
    async fn recall(&self, query: &str, k: usize) -> SynapseResult<String>;

    /// Append one record. Not idempotent: storing the same record twice
    /// yields two entries.
    ///
    /// Storage failure must surface as `StoreUnavailable`.
    async fn remember(&self, record: MemoryRecord) -> SynapseResult<()>;
}

/// Fire-and-forget broadcast of agent messages.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueue `message` for delivery on `topic`.
    ///
    /// Never fails from the caller's point of view. Delivery failures are
    /// logged and counted by the publisher. Messages published from the same
    /// agent are delivered in program order.
    fn publish(&self, topic: &str, message: &AgentMessage);

    /// Wait until every previously enqueued message has been attempted.
    async fn flush(&self);
}
