//! The pipeline graph: registered agents, explicit edges, one entry node.
//!
//! `PipelineGraph` collects agents. `compile()` validates the entry and the
//! edge list and produces a `RunnablePipeline`, which walks the adjacency map
//! from the entry, feeding each agent's output state to the next agent, until
//! a node with no outgoing edge has run.
//!
//! The supported shape is a simple path. Fan-out, cycles, and edges that the
//! walk from the entry can never reach are rejected at compile time with
//! `InvalidTopology`.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use synapse_contracts::{
    error::{SynapseError, SynapseResult},
    run::{RunFailure, RunResult},
    state::{AgentId, SharedState},
    task::{Task, TaskId, TaskStatus},
};

use crate::agent::Agent;

/// Per-run controls supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Deadline for each individual agent turn. `None` waits indefinitely.
    pub agent_timeout: Option<Duration>,
    /// Cancelling this token aborts the run at the next checkpoint, or
    /// immediately if an agent turn is in flight.
    pub cancel: CancellationToken,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// The caller's description of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Generated when absent.
    pub task_id: Option<TaskId>,
    pub query: String,
}

impl RunRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { task_id: None, query: query.into() }
    }

    pub fn with_task_id(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// The initial shared state for this request.
    pub fn into_state(self) -> SharedState {
        SharedState::new(Task::new(self.task_id, self.query))
    }
}

/// Registered agents awaiting compilation.
#[derive(Debug, Default)]
pub struct PipelineGraph {
    nodes: HashMap<AgentId, Arc<Agent>>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `agent` as a node keyed by its id.
    ///
    /// Returns `DuplicateNode` if the id is already taken; the existing
    /// registration is kept.
    pub fn register(&mut self, agent: Agent) -> SynapseResult<()> {
        let id = agent.id().clone();
        if self.contains(&id) {
            return Err(SynapseError::DuplicateNode { agent_id: id.0 });
        }
        debug!(agent_id = %id, "agent registered");
        self.nodes.insert(id, Arc::new(agent));
        Ok(())
    }

    pub fn contains(&self, agent_id: &AgentId) -> bool {
        self.nodes.contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate `entry` and `edges` against the registered nodes and build
    /// an executable pipeline.
    ///
    /// # Errors
    ///
    /// - `UnknownNode` if the entry or any edge endpoint is not registered
    ///   (checked first, entry then edges in list order)
    /// - `InvalidTopology` if a node has two outgoing edges, the edges form
    ///   a cycle, or an edge is not reachable from the entry
    pub fn compile<I, S>(&self, entry: impl Into<AgentId>, edges: I) -> SynapseResult<RunnablePipeline>
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<AgentId>,
    {
        let entry = entry.into();
        self.require(&entry)?;

        let edges: Vec<(AgentId, AgentId)> =
            edges.into_iter().map(|(s, t)| (s.into(), t.into())).collect();

        let mut next: HashMap<AgentId, AgentId> = HashMap::new();
        for (source, target) in &edges {
            self.require(source)?;
            self.require(target)?;
            if let Some(existing) = next.get(source) {
                return Err(SynapseError::InvalidTopology {
                    reason: format!(
                        "agent '{}' has more than one outgoing edge ('{}' and '{}')",
                        source, existing, target
                    ),
                });
            }
            next.insert(source.clone(), target.clone());
        }

        // Walk from the entry. Every edge must be traversed exactly once.
        let mut path = vec![entry.clone()];
        let mut seen: HashSet<&AgentId> = HashSet::from([&entry]);
        let mut cursor = &entry;
        while let Some(target) = next.get(cursor) {
            if !seen.insert(target) {
                return Err(SynapseError::InvalidTopology {
                    reason: format!("edge '{}' -> '{}' closes a cycle", cursor, target),
                });
            }
            path.push(target.clone());
            cursor = target;
        }
        if path.len() - 1 != edges.len() {
            let stray = edges
                .iter()
                .find(|(source, _)| !seen.contains(source))
                .map(|(s, t)| format!("'{}' -> '{}'", s, t))
                .unwrap_or_default();
            return Err(SynapseError::InvalidTopology {
                reason: format!("edge {} is not reachable from entry '{}'", stray, entry),
            });
        }

        let nodes = path
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|a| (id.clone(), a.clone())))
            .collect();

        info!(entry = %entry, nodes = path.len(), "pipeline compiled");

        Ok(RunnablePipeline { entry, next, nodes, path })
    }

    fn require(&self, id: &AgentId) -> SynapseResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(SynapseError::UnknownNode { agent_id: id.0.clone() })
        }
    }
}

/// A validated pipeline, ready to run any number of times, concurrently.
#[derive(Debug, Clone)]
pub struct RunnablePipeline {
    entry: AgentId,
    next: HashMap<AgentId, AgentId>,
    nodes: HashMap<AgentId, Arc<Agent>>,
    path: Vec<AgentId>,
}

impl RunnablePipeline {
    pub fn entry(&self) -> &AgentId {
        &self.entry
    }

    /// The nodes in the order `invoke` visits them.
    pub fn path(&self) -> &[AgentId] {
        &self.path
    }

    /// The node that follows `agent_id`, or `None` at the end of the pipeline.
    pub fn successor(&self, agent_id: &AgentId) -> Option<&AgentId> {
        self.next.get(agent_id)
    }

    /// Start a run for `request`.
    pub async fn run(&self, request: RunRequest, options: &RunOptions) -> RunResult {
        self.invoke(request.into_state(), options).await
    }

    /// Thread `initial` through every node, starting at the entry.
    ///
    /// Nodes run strictly one after another. The first failing node aborts
    /// the run: the returned `RunFailure` carries the state as committed by
    /// the nodes before it. Cancellation is checked before each node and
    /// raced against the node in flight.
    pub async fn invoke(&self, initial: SharedState, options: &RunOptions) -> RunResult {
        let mut state = initial;
        let task_id = state.task.task_id.clone();

        info!(
            task_id = %task_id,
            entry = %self.entry,
            query = %state.original_query(),
            "pipeline run starting"
        );

        let mut current = Some(self.entry.clone());
        while let Some(agent_id) = current {
            if options.cancel.is_cancelled() {
                return Err(self.fail(state, agent_id, SynapseError::Cancelled));
            }

            let Some(agent) = self.nodes.get(&agent_id) else {
                let error = SynapseError::UnknownNode { agent_id: agent_id.0.clone() };
                return Err(self.fail(state, agent_id, error));
            };

            if let Err(error) = Self::run_node(agent, &mut state, options).await {
                return Err(self.fail(state, agent_id, error));
            }

            current = self.next.get(&agent_id).cloned();
        }

        state.set_status(TaskStatus::Done);
        info!(
            task_id = %task_id,
            message_count = state.messages.len(),
            "pipeline run completed"
        );
        Ok(state)
    }

    async fn run_node(
        agent: &Agent,
        state: &mut SharedState,
        options: &RunOptions,
    ) -> SynapseResult<()> {
        let turn = async {
            match options.agent_timeout {
                Some(limit) => match tokio::time::timeout(limit, agent.step(state)).await {
                    Ok(result) => result,
                    Err(_) => Err(SynapseError::Timeout { after_ms: timeout_millis(limit) }),
                },
                None => agent.step(state).await,
            }
        };

        tokio::select! {
            biased;
            _ = options.cancel.cancelled() => Err(SynapseError::Cancelled),
            result = turn => result,
        }
    }

    fn fail(&self, mut state: SharedState, agent_id: AgentId, error: SynapseError) -> Box<RunFailure> {
        state.set_status(TaskStatus::Failed);
        warn!(
            task_id = %state.task.task_id,
            agent_id = %agent_id,
            kind = %error.kind(),
            error = %error,
            "pipeline run aborted"
        );
        Box::new(RunFailure {
            task_id: state.task.task_id.clone(),
            agent_id,
            error,
            state,
        })
    }
}

/// `limit` in whole milliseconds, saturating at `u64::MAX`.
fn timeout_millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}

// ── Tests ────────────────────────────────────────────────────────────────────
