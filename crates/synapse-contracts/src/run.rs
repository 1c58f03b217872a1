//! What a caller gets back from a failed run.

use thiserror::Error;

use crate::{
    error::{ErrorKind, SynapseError},
    state::{AgentId, SharedState},
    task::TaskId,
};

/// A run that aborted at `agent_id`.
///
/// `state` is the last committed state: it holds the messages of every agent
/// that completed before the failure and nothing from the failing agent. Its
/// task status is `Failed`. Memory records written by earlier agents are not
/// rolled back.
#[derive(Debug, Error)]
#[error("task {task_id} failed at agent '{agent_id}': {error}")]
pub struct RunFailure {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    #[source]
    pub error: SynapseError,
    pub state: SharedState,
}

impl RunFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Outcome of one pipeline run.
pub type RunResult = Result<SharedState, Box<RunFailure>>;
