//! Pipeline configuration schema.
//!
//! ```toml
//! [pipeline]
//! entry = "Triage_Node"
//! edges = [["Triage_Node", "Research_Node"]]
//! topic = "agent_events"
//! recall_k = 3
//! agent_timeout_secs = 120
//!
//! [memory]
//! path = "memory.jsonl"
//! min_score = 0.3
//!
//! [[agents]]
//! id = "Triage_Node"
//! system_prompt = "You are a highly analytical Healthcare Triage Agent."
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use synapse_contracts::{
    error::{SynapseError, SynapseResult},
    memory::DEFAULT_RECALL_K,
};
use synapse_core::{
    traits::{EventPublisher, LanguageModel, MemoryStore},
    Agent, PipelineGraph, RunOptions, RunnablePipeline, DEFAULT_TOPIC,
};
use synapse_memory::{InMemoryMemoryStore, JsonlMemoryStore, DEFAULT_MIN_SCORE};

use crate::roles;

/// Overrides `memory.path`.
pub const ENV_MEMORY_PATH: &str = "SYNAPSE_MEMORY_PATH";
/// Overrides `pipeline.topic`.
pub const ENV_EVENT_TOPIC: &str = "SYNAPSE_EVENT_TOPIC";
/// Overrides `pipeline.agent_timeout_secs`.
pub const ENV_AGENT_TIMEOUT_SECS: &str = "SYNAPSE_AGENT_TIMEOUT_SECS";

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub memory: MemorySection,
    pub agents: Vec<AgentConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSection {
    pub entry: String,
    /// `[source, target]` pairs.
    #[serde(default)]
    pub edges: Vec<[String; 2]>,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_recall_k")]
    pub recall_k: usize,
    /// Per-agent deadline. Absent means no deadline.
    #[serde(default)]
    pub agent_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySection {
    /// JSON-lines file for durable memory. Absent keeps memory in process.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self { path: None, min_score: DEFAULT_MIN_SCORE }
    }
}

/// One agent: its id and its role prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub system_prompt: String,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_recall_k() -> usize {
    DEFAULT_RECALL_K
}

fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}

impl Default for PipelineConfig {
    /// Healthcare triage followed by financial research.
    fn default() -> Self {
        Self {
            pipeline: PipelineSection {
                entry: roles::TRIAGE_AGENT_ID.to_string(),
                edges: vec![[
                    roles::TRIAGE_AGENT_ID.to_string(),
                    roles::RESEARCH_AGENT_ID.to_string(),
                ]],
                topic: default_topic(),
                recall_k: DEFAULT_RECALL_K,
                agent_timeout_secs: None,
            },
            memory: MemorySection::default(),
            agents: vec![
                AgentConfig {
                    id: roles::TRIAGE_AGENT_ID.to_string(),
                    system_prompt: roles::HEALTHCARE_TRIAGE.to_string(),
                },
                AgentConfig {
                    id: roles::RESEARCH_AGENT_ID.to_string(),
                    system_prompt: roles::FINANCIAL_RESEARCH.to_string(),
                },
            ],
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    ///
    /// Returns `ConfigError` if the TOML is malformed, does not match the
    /// schema, or fails [`PipelineConfig::validate`].
    pub fn from_toml_str(s: &str) -> SynapseResult<Self> {
        let config: PipelineConfig = toml::from_str(s).map_err(|e| SynapseError::ConfigError {
            reason: format!("failed to parse pipeline TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML pipeline configuration.
    pub fn from_file(path: &std::path::Path) -> SynapseResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SynapseError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply deploy-time overrides from the process environment.
    pub fn apply_env(&mut self) -> SynapseResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup` (see the `ENV_*` keys).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> SynapseResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_MEMORY_PATH) {
            debug!(key = ENV_MEMORY_PATH, "memory path overridden");
            self.memory.path = Some(PathBuf::from(path));
        }
        if let Some(topic) = lookup(ENV_EVENT_TOPIC) {
            debug!(key = ENV_EVENT_TOPIC, "event topic overridden");
            self.pipeline.topic = topic;
        }
        if let Some(raw) = lookup(ENV_AGENT_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|e| SynapseError::ConfigError {
                reason: format!("{} must be a whole number of seconds: {}", ENV_AGENT_TIMEOUT_SECS, e),
            })?;
            self.pipeline.agent_timeout_secs = Some(secs);
        }
        self.validate()
    }

    /// Check values the type system cannot.
    ///
    /// Graph shape (unknown ids, duplicates, cycles) is left to
    /// `PipelineGraph`, which reports it with the assembly error kinds.
    pub fn validate(&self) -> SynapseResult<()> {
        if self.agents.is_empty() {
            return Err(config_error("at least one [[agents]] entry is required"));
        }
        if let Some(agent) = self.agents.iter().find(|a| a.id.trim().is_empty()) {
            return Err(config_error(format!(
                "agent ids must not be empty (system_prompt: '{}')",
                agent.system_prompt
            )));
        }
        if self.pipeline.topic.trim().is_empty() {
            return Err(config_error("pipeline.topic must not be empty"));
        }
        if self.pipeline.recall_k == 0 {
            return Err(config_error("pipeline.recall_k must be at least 1"));
        }
        if self.pipeline.agent_timeout_secs == Some(0) {
            return Err(config_error("pipeline.agent_timeout_secs must be at least 1"));
        }
        if !self.memory.min_score.is_finite() {
            return Err(config_error("memory.min_score must be a finite number"));
        }
        Ok(())
    }

    /// Run options carrying the configured per-agent timeout.
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new();
        if let Some(secs) = self.pipeline.agent_timeout_secs {
            options = options.with_agent_timeout(Duration::from_secs(secs));
        }
        options
    }

    /// Open the configured memory backend.
    pub async fn open_memory(&self) -> SynapseResult<Arc<dyn MemoryStore>> {
        match &self.memory.path {
            Some(path) => {
                let store = JsonlMemoryStore::open(path)
                    .await?
                    .with_min_score(self.memory.min_score);
                Ok(Arc::new(store))
            }
            None => Ok(Arc::new(
                InMemoryMemoryStore::new().with_min_score(self.memory.min_score),
            )),
        }
    }

    /// Register every configured agent against the shared collaborators and
    /// compile the configured edges.
    pub fn build(
        &self,
        llm: Arc<dyn LanguageModel>,
        memory: Arc<dyn MemoryStore>,
        events: Arc<dyn EventPublisher>,
    ) -> SynapseResult<RunnablePipeline> {
        let mut graph = PipelineGraph::new();
        for agent in &self.agents {
            graph.register(
                Agent::new(
                    agent.id.as_str(),
                    agent.system_prompt.clone(),
                    llm.clone(),
                    memory.clone(),
                    events.clone(),
                )
                .with_topic(self.pipeline.topic.clone())
                .with_recall_k(self.pipeline.recall_k),
            )?;
        }

        let edges = self
            .pipeline
            .edges
            .iter()
            .map(|[source, target]| (source.as_str(), target.as_str()));
        let pipeline = graph.compile(self.pipeline.entry.as_str(), edges)?;

        info!(
            entry = %self.pipeline.entry,
            agents = self.agents.len(),
            topic = %self.pipeline.topic,
            "pipeline built from configuration"
        );
        Ok(pipeline)
    }
}

fn config_error(reason: impl Into<String>) -> SynapseError {
    SynapseError::ConfigError { reason: reason.into() }
}
