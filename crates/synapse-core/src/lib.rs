//! # synapse-core
//!
//! The orchestration core of the Synapse agent pipeline.
//!
//! This crate provides:
//! - The three collaborator traits (`LanguageModel`, `MemoryStore`, `EventPublisher`)
//! - The concrete `Agent` and its per-turn state machine
//! - `PipelineGraph`, which compiles registered agents and edges into a
//!   `RunnablePipeline` that threads one `SharedState` through them
//!
//! ## Usage
//!
//! ```rust,ignore
//! use synapse_core::{Agent, PipelineGraph, RunOptions, RunRequest};
//!
//! let mut graph = PipelineGraph::new();
//! graph.register(triage)?;
//! graph.register(research)?;
//! let pipeline = graph.compile("Triage_Node", [("Triage_Node", "Research_Node")])?;
//! let state = pipeline.run(RunRequest::new("chest pain"), &RunOptions::new()).await?;
//! ```

pub mod agent;
pub mod pipeline;
pub mod prompt;
pub mod traits;

pub use agent::{Agent, AgentPhase, DEFAULT_TOPIC};
pub use pipeline::{PipelineGraph, RunOptions, RunRequest, RunnablePipeline};
