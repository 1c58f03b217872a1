//! In-memory implementation of `MemoryStore`.
//!
//! `InMemoryMemoryStore` keeps every record in a `Vec` behind a `Mutex`, so
//! one store can be shared by many concurrent runs. Nothing survives the
//! process; use `JsonlMemoryStore` for durable memory.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info};

use synapse_contracts::{
    error::{SynapseError, SynapseResult},
    memory::MemoryRecord,
};
use synapse_core::traits::MemoryStore;

use crate::similarity::{rank, Similarity, TokenOverlap, DEFAULT_MIN_SCORE};

/// A thread-safe, append-only memory store held in process memory.
pub struct InMemoryMemoryStore {
    pub(crate) records: Arc<Mutex<Vec<MemoryRecord>>>,
    similarity: Arc<dyn Similarity>,
    min_score: f32,
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMemoryStore {
    /// An empty store using [`TokenOverlap`] and [`DEFAULT_MIN_SCORE`].
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            similarity: Arc::new(TokenOverlap),
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("memory lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every stored record, in insertion order.
    pub fn snapshot(&self) -> Vec<MemoryRecord> {
        self.records.lock().expect("memory lock poisoned").clone()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn recall(&self, query: &str, k: usize) -> SynapseResult<String> {
        let records = self.records.lock().map_err(|e| SynapseError::StoreUnavailable {
            reason: format!("memory lock poisoned: {}", e),
        })?;
        debug!(stored = records.len(), k, "recalling from in-memory store");
        Ok(rank(&records, query, k, self.similarity.as_ref(), self.min_score))
    }

    async fn remember(&self, record: MemoryRecord) -> SynapseResult<()> {
        let mut records = self.records.lock().map_err(|e| SynapseError::StoreUnavailable {
            reason: format!("memory lock poisoned: {}", e),
        })?;

        let metadata = record.tagged_metadata();
        info!(
            agent_id = %record.agent_id,
            query = %preview(&record.query),
            "stored memory of task"
        );
        records.push(record.with_metadata(metadata));
        Ok(())
    }
}

/// First 30 characters of `text`, for log lines.
pub(crate) fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(30).collect();
    if text.chars().count() > 30 {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use synapse_contracts::{
        memory::{MemoryRecord, NO_EXPERIENCES_FOUND, RECALL_SEPARATOR},
        state::AgentId,
    };
    use synapse_core::traits::MemoryStore;

    use crate::similarity::Similarity;

    use super::{preview, InMemoryMemoryStore};

    fn record(query: &str, solution: &str) -> MemoryRecord {
        MemoryRecord::new(AgentId::from("Triage_Node"), query, solution)
    }

    struct Constant(f32);

    impl Similarity for Constant {
        fn score(&self, _query: &str, _document: &str) -> f32 {
            self.0
        }
    }

    #[tokio::test]
    async fn test_empty_store_returns_sentinel() {
        let store = InMemoryMemoryStore::new();
        for q in ["", "ping", "chest pain and dizziness"] {
            assert_eq!(store.recall(q, 3).await.unwrap(), NO_EXPERIENCES_FOUND);
        }
    }

    #[tokio::test]
    async fn test_remember_then_recall_round_trip() {
        let store = InMemoryMemoryStore::new();
        store.remember(record("x", "y")).await.unwrap();

        let recalled = store.recall("x", 1).await.unwrap();
        assert!(recalled.contains('x'));
        assert!(recalled.contains('y'));
    }

    const TRIAGE_SOLUTION: &str = "Classified as CRITICAL. The symptoms are consistent with \
        an acute coronary event, so the patient was routed to cardiology for an immediate \
        ECG. Vital signs should be rechecked every five minutes until a cardiologist takes \
        over. Escalate to the resuscitation team if blood pressure drops or the patient loses \
        consciousness. Document onset time, radiation of the discomfort and any history of \
        hypertension, diabetes or smoking for the receiving team.";

    #[tokio::test]
    async fn test_round_trip_with_realistic_solution() {
        let store = InMemoryMemoryStore::new();
        store
            .remember(record("patient reports severe chest pain", TRIAGE_SOLUTION))
            .await
            .unwrap();
        store
            .remember(record("tech stocks outlook", "Bullish on semiconductors for Q3."))
            .await
            .unwrap();

        let recalled = store.recall("patient reports severe chest pain", 3).await.unwrap();
        assert_eq!(
            recalled,
            format!("Query: patient reports severe chest pain\nSolution: {}", TRIAGE_SOLUTION)
        );
    }

    #[tokio::test]
    async fn test_paraphrased_query_recalls_record() {
        let store = InMemoryMemoryStore::new();
        store
            .remember(record("patient reports severe chest pain", TRIAGE_SOLUTION))
            .await
            .unwrap();

        let recalled = store.recall("severe chest pain reported by patient", 3).await.unwrap();
        assert_ne!(recalled, NO_EXPERIENCES_FOUND);
        assert!(recalled.contains("routed to cardiology"));
    }

    #[tokio::test]
    async fn test_remember_is_not_idempotent() {
        let store = InMemoryMemoryStore::new();
        store.remember(record("x", "y")).await.unwrap();
        store.remember(record("x", "y")).await.unwrap();
        assert_eq!(store.len(), 2);

        let recalled = store.recall("x", 3).await.unwrap();
        assert_eq!(recalled.split(RECALL_SEPARATOR).count(), 2);
    }

    #[tokio::test]
    async fn test_remember_tags_metadata() {
        let store = InMemoryMemoryStore::new();
        store.remember(record("x", "y")).await.unwrap();

        let stored = store.snapshot();
        assert_eq!(stored[0].metadata["agent_id"], serde_json::json!("Triage_Node"));
        assert_eq!(stored[0].metadata["type"], serde_json::json!("success_record"));
    }

    #[tokio::test]
    async fn test_unrelated_query_is_below_threshold() {
        let store = InMemoryMemoryStore::new();
        store.remember(record("chest pain", "CRITICAL, cardiology")).await.unwrap();

        let recalled = store.recall("quarterly earnings", 3).await.unwrap();
        assert_eq!(recalled, NO_EXPERIENCES_FOUND);
    }

    #[tokio::test]
    async fn test_recall_caps_at_k() {
        let store = InMemoryMemoryStore::new().with_similarity(Arc::new(Constant(0.5)));
        for i in 0..5 {
            store.remember(record(&format!("q{}", i), "s")).await.unwrap();
        }

        let recalled = store.recall("anything", 3).await.unwrap();
        assert_eq!(recalled.split(RECALL_SEPARATOR).count(), 3);
    }

    #[tokio::test]
    async fn test_min_score_filters_everything() {
        let store = InMemoryMemoryStore::new()
            .with_similarity(Arc::new(Constant(0.5)))
            .with_min_score(0.9);
        store.remember(record("x", "y")).await.unwrap();

        assert_eq!(store.recall("x", 3).await.unwrap(), NO_EXPERIENCES_FOUND);
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short"), "short");
        let long = "a".repeat(40);
        assert_eq!(preview(&long), format!("{}...", "a".repeat(30)));
    }
}
