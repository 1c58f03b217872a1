//! Error taxonomy for pipeline assembly and pipeline runs.
//!
//! Assembly errors (`DuplicateNode`, `UnknownNode`, `InvalidTopology`,
//! `ConfigError`) are reported before any run starts. Every other variant is
//! a run-time error: it aborts the current run at the failing agent and
//! leaves other runs and the compiled graph untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The unified error type for the Synapse crates.
#[derive(Debug, Error)]
pub enum SynapseError {
    /// An agent with this id is already registered.
    #[error("agent '{agent_id}' is already registered")]
    DuplicateNode { agent_id: String },

    /// The entry or an edge endpoint names an agent that was never registered.
    #[error("agent '{agent_id}' is not registered")]
    UnknownNode { agent_id: String },

    /// The edge list does not describe a simple path from the entry.
    #[error("invalid pipeline topology: {reason}")]
    InvalidTopology { reason: String },

    /// The memory backend could not be reached or could not persist.
    #[error("memory store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// The language model could not be reached.
    #[error("language model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// The language model was reached but returned an error.
    #[error("language model error: {reason}")]
    ModelError { reason: String },

    /// The agent step exceeded its caller-supplied deadline.
    #[error("agent step timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// The run was cancelled by its caller.
    #[error("run cancelled")]
    Cancelled,

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl SynapseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SynapseError::DuplicateNode { .. } => ErrorKind::DuplicateNode,
            SynapseError::UnknownNode { .. } => ErrorKind::UnknownNode,
            SynapseError::InvalidTopology { .. } => ErrorKind::InvalidTopology,
            SynapseError::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            SynapseError::ModelUnavailable { .. } => ErrorKind::ModelUnavailable,
            SynapseError::ModelError { .. } => ErrorKind::ModelError,
            SynapseError::Timeout { .. } => ErrorKind::Timeout,
            SynapseError::Cancelled => ErrorKind::Cancelled,
            SynapseError::ConfigError { .. } => ErrorKind::ConfigError,
        }
    }

    /// True for errors raised while building a pipeline rather than running it.
    pub fn is_assembly_error(&self) -> bool {
        matches!(
            self,
            SynapseError::DuplicateNode { .. }
                | SynapseError::UnknownNode { .. }
                | SynapseError::InvalidTopology { .. }
                | SynapseError::ConfigError { .. }
        )
    }
}

/// Flat discriminant of [`SynapseError`], suitable for reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DuplicateNode,
    UnknownNode,
    InvalidTopology,
    StoreUnavailable,
    ModelUnavailable,
    ModelError,
    Timeout,
    Cancelled,
    ConfigError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Convenience alias used throughout the Synapse crates.
pub type SynapseResult<T> = Result<T, SynapseError>;
