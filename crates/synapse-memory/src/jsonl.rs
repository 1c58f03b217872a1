//! Durable, append-only memory backed by a JSON-lines file.
//!
//! Each `remember` appends one serialized `MemoryRecord` line and flushes it
//! before returning. On `open` the existing file is loaded into memory and
//! ranked with the same routine as the in-memory store. Lines that fail to
//! parse are skipped with a warning rather than failing the whole store.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use tracing::{info, warn};

use synapse_contracts::{
    error::{SynapseError, SynapseResult},
    memory::MemoryRecord,
};
use synapse_core::traits::MemoryStore;

use crate::{
    memory::preview,
    similarity::{rank, Similarity, TokenOverlap, DEFAULT_MIN_SCORE},
};

pub struct JsonlMemoryStore {
    path: PathBuf,
    records: Mutex<Vec<MemoryRecord>>,
    similarity: Arc<dyn Similarity>,
    min_score: f32,
}

impl JsonlMemoryStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// Returns `StoreUnavailable` if the file exists but cannot be read.
    pub async fn open(path: impl AsRef<Path>) -> SynapseResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => parse_lines(&path, &contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(SynapseError::StoreUnavailable {
                    reason: format!("failed to read memory file '{}': {}", path.display(), e),
                })
            }
        };

        info!(path = %path.display(), records = records.len(), "memory store opened");

        Ok(Self {
            path,
            records: Mutex::new(records),
            similarity: Arc::new(TokenOverlap),
            min_score: DEFAULT_MIN_SCORE,
        })
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn Similarity>) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

fn parse_lines(path: &Path, contents: &str) -> Vec<MemoryRecord> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<MemoryRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    line = idx + 1,
                    error = %e,
                    "skipping unreadable memory record"
                );
                None
            }
        })
        .collect()
}

#[async_trait]
impl MemoryStore for JsonlMemoryStore {
    async fn recall(&self, query: &str, k: usize) -> SynapseResult<String> {
        let records = self.records.lock().await;
        Ok(rank(&records, query, k, self.similarity.as_ref(), self.min_score))
    }

    async fn remember(&self, record: MemoryRecord) -> SynapseResult<()> {
        let metadata = record.tagged_metadata();
        let record = record.with_metadata(metadata);

        let mut line = serde_json::to_string(&record).map_err(|e| SynapseError::StoreUnavailable {
            reason: format!("failed to serialize memory record: {}", e),
        })?;
        line.push('\n');

        // Holding the lock across the write keeps file order equal to
        // in-memory order.
        let mut records = self.records.lock().await;

        let unavailable = |e: std::io::Error| SynapseError::StoreUnavailable {
            reason: format!("failed to append to '{}': {}", self.path.display(), e),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(unavailable)?;
        file.write_all(line.as_bytes()).await.map_err(unavailable)?;
        file.flush().await.map_err(unavailable)?;

        info!(
            agent_id = %record.agent_id,
            query = %preview(&record.query),
            path = %self.path.display(),
            "stored memory of task"
        );
        records.push(record);
        Ok(())
    }
}
