//! The concrete agent: one named unit of work in a pipeline.
//!
//! Every agent runs the same per-turn state machine:
//!
//!   Idle → Recalling → Prompting → Invoking → Recording → Completed
//!
//! and moves to `Failed` from whichever phase raised an error. Domain
//! variation (triage, research, …) is carried entirely by the role prompt.
//!
//! Shared state is only touched in the final `Completed` transition, after
//! every fallible step has succeeded. A failed or abandoned turn therefore
//! leaves the caller's state exactly as it was handed in.

use std::sync::Arc;

use tracing::{debug, info, warn};

use synapse_contracts::{
    error::SynapseResult,
    memory::{MemoryRecord, DEFAULT_RECALL_K},
    state::{AgentId, AgentMessage, Metadata, SharedState},
};

use crate::{
    prompt,
    traits::{EventPublisher, LanguageModel, MemoryStore},
};

/// Topic agent messages are published on unless configured otherwise.
pub const DEFAULT_TOPIC: &str = "agent_events";

/// Phases of a single agent turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Idle,
    Recalling,
    Prompting,
    Invoking,
    Recording,
    Completed,
    Failed,
}

impl std::fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AgentPhase::Idle => "idle",
            AgentPhase::Recalling => "recalling",
            AgentPhase::Prompting => "prompting",
            AgentPhase::Invoking => "invoking",
            AgentPhase::Recording => "recording",
            AgentPhase::Completed => "completed",
            AgentPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A registered agent. Immutable after construction; identity is `id`.
///
/// The memory write after each turn is unconditional: there is no critique
/// or verification step, so every model answer is stored as a
/// `success_record`. A quality gate belongs between `Invoking` and
/// `Recording` in [`Agent::step`].
#[derive(Clone)]
pub struct Agent {
    id: AgentId,
    role_prompt: String,
    llm: Arc<dyn LanguageModel>,
    memory: Arc<dyn MemoryStore>,
    events: Arc<dyn EventPublisher>,
    topic: String,
    recall_k: usize,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("recall_k", &self.recall_k)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create an agent publishing on [`DEFAULT_TOPIC`] and recalling
    /// [`DEFAULT_RECALL_K`] records per turn.
    pub fn new(
        id: impl Into<AgentId>,
        role_prompt: impl Into<String>,
        llm: Arc<dyn LanguageModel>,
        memory: Arc<dyn MemoryStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            id: id.into(),
            role_prompt: role_prompt.into(),
            llm,
            memory,
            events,
            topic: DEFAULT_TOPIC.to_string(),
            recall_k: DEFAULT_RECALL_K,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_recall_k(mut self, k: usize) -> Self {
        self.recall_k = k;
        self
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn role_prompt(&self) -> &str {
        &self.role_prompt
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run one turn and return the mutated state.
    pub async fn invoke(&self, mut state: SharedState) -> SynapseResult<SharedState> {
        self.step(&mut state).await?;
        Ok(state)
    }

    /// Run one turn against `state`.
    ///
    /// On success `state` gains exactly one message and one
    /// `<agent_id>_completed` flag, and exactly one publish and one remember
    /// have been issued. On error `state` is unchanged.
    pub async fn step(&self, state: &mut SharedState) -> SynapseResult<()> {
        let mut phase = AgentPhase::Idle;
        let result = self.run_phases(state, &mut phase).await;

        if let Err(e) = &result {
            warn!(
                task_id = %state.task.task_id,
                agent_id = %self.id,
                phase = %phase,
                error = %e,
                "agent turn failed"
            );
            self.enter(&mut phase, AgentPhase::Failed);
        }
        result
    }

    async fn run_phases(
        &self,
        state: &mut SharedState,
        phase: &mut AgentPhase,
    ) -> SynapseResult<()> {
        let task_id = state.task.task_id.clone();

        // ── Idle → Recalling ─────────────────────────────────────────────────
        self.enter(phase, AgentPhase::Recalling);
        let query = state.original_query().to_string();
        let recalled = self.memory.recall(&query, self.recall_k).await?;

        // ── Recalling → Prompting ────────────────────────────────────────────
        self.enter(phase, AgentPhase::Prompting);
        let messages = prompt::build(self.role_prompt(), &recalled, state);

        // ── Prompting → Invoking ─────────────────────────────────────────────
        self.enter(phase, AgentPhase::Invoking);
        let content = self.llm.invoke(&messages).await?;

        // ── Invoking → Recording ─────────────────────────────────────────────
        self.enter(phase, AgentPhase::Recording);
        let mut meta = Metadata::new();
        meta.insert(
            "task_id".to_string(),
            serde_json::Value::String(task_id.0.clone()),
        );

        let message = AgentMessage::new(self.id.clone(), content.clone()).with_metadata(meta.clone());
        self.events.publish(&self.topic, &message);

        let record = MemoryRecord::new(self.id.clone(), query, content).with_metadata(meta);
        self.memory.remember(record).await?;

        // ── Recording → Completed ────────────────────────────────────────────
        state.commit(message);
        self.enter(phase, AgentPhase::Completed);

        info!(
            task_id = %task_id,
            agent_id = %self.id,
            message_count = state.messages.len(),
            "agent turn completed"
        );
        Ok(())
    }

    fn enter(&self, phase: &mut AgentPhase, next: AgentPhase) {
        debug!(agent_id = %self.id, from = %phase, to = %next, "agent phase transition");
        *phase = next;
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use synapse_contracts::{
        error::{SynapseError, SynapseResult},
        llm::{ChatMessage, Role},
        memory::{MemoryRecord, NO_EXPERIENCES_FOUND},
        state::{AgentId, AgentMessage, SharedState},
        task::Task,
    };

    use crate::traits::{EventPublisher, LanguageModel, MemoryStore};

    use super::{Agent, AgentPhase};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// A model that returns a fixed reply and records every prompt it saw.
    struct StubModel {
        reply: String,
        prompts: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    #[async_trait]
    impl LanguageModel for StubModel {
        async fn invoke(&self, messages: &[ChatMessage]) -> SynapseResult<String> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn invoke(&self, _messages: &[ChatMessage]) -> SynapseResult<String> {
            Err(SynapseError::ModelUnavailable { reason: "connection refused".to_string() })
        }
    }

    /// A memory store with a canned recall answer that records writes.
    struct MockMemory {
        recall_answer: String,
        recalls: Arc<Mutex<Vec<(String, usize)>>>,
        records: Arc<Mutex<Vec<MemoryRecord>>>,
        fail_recall: bool,
        fail_remember: bool,
    }

    impl MockMemory {
        fn new(recall_answer: &str) -> Self {
            Self {
                recall_answer: recall_answer.to_string(),
                recalls: Arc::new(Mutex::new(vec![])),
                records: Arc::new(Mutex::new(vec![])),
                fail_recall: false,
                fail_remember: false,
            }
        }
    }

    #[async_trait]
    impl MemoryStore for MockMemory {
        async fn recall(&self, query: &str, k: usize) -> SynapseResult<String> {
            self.recalls.lock().unwrap().push((query.to_string(), k));
            if self.fail_recall {
                return Err(SynapseError::StoreUnavailable { reason: "index offline".to_string() });
            }
            Ok(self.recall_answer.clone())
        }

        async fn remember(&self, record: MemoryRecord) -> SynapseResult<()> {
            if self.fail_remember {
                return Err(SynapseError::StoreUnavailable { reason: "db down".to_string() });
            }
            self.records.lock().unwrap().push(record);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockPublisher {
        published: Arc<Mutex<Vec<(String, AgentMessage)>>>,
    }

    #[async_trait]
    impl EventPublisher for MockPublisher {
        fn publish(&self, topic: &str, message: &AgentMessage) {
            self.published.lock().unwrap().push((topic.to_string(), message.clone()));
        }

        async fn flush(&self) {}
    }

    fn make_state(query: &str) -> SharedState {
        SharedState::new(Task::new(None, query))
    }

    // ── Test cases ───────────────────────────────────────────────────────────

    /// A successful turn adds exactly one message, one completion flag, one
    /// memory record, and one published event.
    #[tokio::test]
    async fn test_successful_turn_side_effects() {
        let prompts = Arc::new(Mutex::new(vec![]));
        let memory = MockMemory::new(NO_EXPERIENCES_FOUND);
        let records = memory.records.clone();
        let recalls = memory.recalls.clone();
        let publisher = MockPublisher::default();
        let published = publisher.published.clone();

        let agent = Agent::new(
            "A",
            "You are agent A.",
            Arc::new(StubModel { reply: "pong-A".to_string(), prompts: prompts.clone() }),
            Arc::new(memory),
            Arc::new(publisher),
        );

        let state = agent.invoke(make_state("ping")).await.unwrap();

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].agent_id, AgentId::from("A"));
        assert_eq!(state.messages[0].content, "pong-A");
        assert_eq!(state.context.len(), 1);
        assert!(state.is_completed(&AgentId::from("A")));

        assert_eq!(*recalls.lock().unwrap(), vec![("ping".to_string(), 3)]);

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].query, "ping");
        assert_eq!(records[0].solution, "pong-A");

        let published = published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "agent_events");
        assert_eq!(published[0].1, state.messages[0]);
    }

    /// The recalled memory lands in the system prompt and the prior
    /// transcript lands in the user prompt.
    #[tokio::test]
    async fn test_prompt_carries_memory_and_transcript() {
        let prompts = Arc::new(Mutex::new(vec![]));
        let agent = Agent::new(
            "B",
            "You are agent B.",
            Arc::new(StubModel { reply: "pong-B".to_string(), prompts: prompts.clone() }),
            Arc::new(MockMemory::new("Query: old\nSolution: worked")),
            Arc::new(MockPublisher::default()),
        )
        .with_recall_k(1);

        let mut state = make_state("ping");
        state.commit(AgentMessage::new(AgentId::from("A"), "pong-A"));
        agent.step(&mut state).await.unwrap();

        let prompts = prompts.lock().unwrap();
        let sent = &prompts[0];
        assert_eq!(sent[0].role, Role::System);
        assert!(sent[0].content.starts_with("You are agent B."));
        assert!(sent[0].content.contains("Solution: worked"));
        assert_eq!(sent[1].content, "A: pong-A\n\nCurrent Task: ping");
    }

    /// A model failure leaves the state untouched and writes nothing.
    #[tokio::test]
    async fn test_model_failure_leaves_state_untouched() {
        let memory = MockMemory::new(NO_EXPERIENCES_FOUND);
        let records = memory.records.clone();
        let publisher = MockPublisher::default();
        let published = publisher.published.clone();

        let agent = Agent::new(
            "A",
            "role",
            Arc::new(FailingModel),
            Arc::new(memory),
            Arc::new(publisher),
        );

        let mut state = make_state("ping");
        let result = agent.step(&mut state).await;

        assert!(matches!(result, Err(SynapseError::ModelUnavailable { .. })));
        assert!(state.messages.is_empty());
        assert!(state.context.is_empty());
        assert!(records.lock().unwrap().is_empty());
        assert!(published.lock().unwrap().is_empty());
    }

    /// A recall failure stops the turn before the model is called.
    #[tokio::test]
    async fn test_recall_failure_propagates() {
        let mut memory = MockMemory::new(NO_EXPERIENCES_FOUND);
        memory.fail_recall = true;
        let records = memory.records.clone();
        let recalls = memory.recalls.clone();
        let prompts = Arc::new(Mutex::new(vec![]));
        let publisher = MockPublisher::default();
        let published = publisher.published.clone();

        let agent = Agent::new(
            "A",
            "role",
            Arc::new(StubModel { reply: "out".to_string(), prompts: prompts.clone() }),
            Arc::new(memory),
            Arc::new(publisher),
        );

        let mut state = make_state("ping");
        let result = agent.step(&mut state).await;

        assert!(matches!(result, Err(SynapseError::StoreUnavailable { .. })));
        assert_eq!(recalls.lock().unwrap().len(), 1);
        assert!(prompts.lock().unwrap().is_empty());
        assert!(state.messages.is_empty());
        assert!(state.context.is_empty());
        assert!(records.lock().unwrap().is_empty());
        assert!(published.lock().unwrap().is_empty());
    }

    /// A memory write failure fails the turn rather than being hidden.
    #[tokio::test]
    async fn test_remember_failure_propagates() {
        let mut memory = MockMemory::new(NO_EXPERIENCES_FOUND);
        memory.fail_remember = true;

        let agent = Agent::new(
            "A",
            "role",
            Arc::new(StubModel { reply: "out".to_string(), prompts: Arc::new(Mutex::new(vec![])) }),
            Arc::new(memory),
            Arc::new(MockPublisher::default()),
        );

        let mut state = make_state("ping");
        let result = agent.step(&mut state).await;

        assert!(matches!(result, Err(SynapseError::StoreUnavailable { .. })));
        assert!(state.messages.is_empty());
        assert!(!state.is_completed(&AgentId::from("A")));
    }

    #[tokio::test]
    async fn test_custom_topic_is_used() {
        let publisher = MockPublisher::default();
        let published = publisher.published.clone();
        let agent = Agent::new(
            "A",
            "role",
            Arc::new(StubModel { reply: "x".to_string(), prompts: Arc::new(Mutex::new(vec![])) }),
            Arc::new(MockMemory::new(NO_EXPERIENCES_FOUND)),
            Arc::new(publisher),
        )
        .with_topic("triage_events");

        agent.invoke(make_state("q")).await.unwrap();
        assert_eq!(published.lock().unwrap()[0].0, "triage_events");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(AgentPhase::Recalling.to_string(), "recalling");
        assert_eq!(AgentPhase::Failed.to_string(), "failed");
    }
}
