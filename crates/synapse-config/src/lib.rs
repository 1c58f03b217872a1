//! # synapse-config
//!
//! TOML-driven configuration for a Synapse pipeline.
//!
//! ## Overview
//!
//! A [`PipelineConfig`] names the agents (id plus role prompt), the entry
//! agent, the edge list, and the run-wide settings: event topic, recall
//! depth, per-agent timeout, and memory backend. [`PipelineConfig::build`]
//! turns it into a compiled `RunnablePipeline`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use synapse_config::PipelineConfig;
//!
//! let mut config = PipelineConfig::from_file(Path::new("pipeline.toml"))?;
//! config.apply_env()?;
//! let memory = config.open_memory().await?;
//! let pipeline = config.build(llm, memory, events)?;
//! let state = pipeline.run(request, &config.run_options()).await?;
//! ```

pub mod config;
pub mod roles;

pub use config::{AgentConfig, MemorySection, PipelineConfig, PipelineSection};

// ── Tests ─────────────────────────────────────────────────────────────────────
