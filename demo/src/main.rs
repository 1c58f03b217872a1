//! Synapse node CLI.
//!
//! Runs the configured agent pipeline for one task. Every agent message is
//! logged as `[agent_id]: content` and published through the event
//! publisher, which is flushed before exit.
//!
//! Usage:
//!   synapse --role orchestrator --task "Patient reports chest pain"
//!   synapse --role orchestrator --task "..." --config pipeline.toml
//!   synapse --role agent
//!
//! Set RUST_LOG=debug for per-phase agent logs.

mod echo;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use synapse_config::PipelineConfig;
use synapse_contracts::{error::SynapseResult, task::TaskId};
use synapse_core::{traits::EventPublisher, RunRequest};
use synapse_events::{ChannelPublisher, TracingSink};

use crate::echo::EchoModel;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Synapse node CLI.
#[derive(Parser)]
#[command(name = "synapse", about = "Synapse agent pipeline node")]
struct Cli {
    /// Which kind of node to start.
    #[arg(long, value_enum)]
    role: NodeRole,

    /// Task description for the orchestrator.
    #[arg(long)]
    task: Option<String>,

    /// Pipeline configuration (TOML). Defaults to triage → research.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reuse a task id instead of generating one.
    #[arg(long)]
    task_id: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum NodeRole {
    Orchestrator,
    Agent,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.role {
        NodeRole::Agent => {
            info!("agent daemon mode is not available from the CLI");
            ExitCode::SUCCESS
        }
        NodeRole::Orchestrator => {
            let Some(task) = cli.task.clone() else {
                error!("a --task must be provided for the orchestrator");
                return ExitCode::FAILURE;
            };
            match run_orchestrator(&cli, task).await {
                Ok(code) => code,
                Err(e) => {
                    error!(error = %e, "pipeline setup failed");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

async fn run_orchestrator(cli: &Cli, task: String) -> SynapseResult<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_env()?;

    let memory = config.open_memory().await?;
    let events = Arc::new(ChannelPublisher::spawn(Arc::new(TracingSink)));
    let pipeline = config.build(Arc::new(EchoModel), memory, events.clone())?;

    let mut request = RunRequest::new(task);
    if let Some(id) = &cli.task_id {
        request = request.with_task_id(TaskId(id.clone()));
    }

    let outcome = pipeline.run(request, &config.run_options()).await;

    let code = match outcome {
        Ok(state) => {
            info!(task_id = %state.task.task_id, status = %state.task.status, "pipeline finished");
            for msg in &state.messages {
                info!("[{}]: {}", msg.agent_id, msg.content);
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            for msg in &failure.state.messages {
                info!("[{}]: {}", msg.agent_id, msg.content);
            }
            error!(
                task_id = %failure.task_id,
                agent_id = %failure.agent_id,
                kind = %failure.kind(),
                error = %failure.error,
                "pipeline failed"
            );
            ExitCode::FAILURE
        }
    };

    events.flush().await;
    if events.failed_publishes() > 0 {
        error!(failed = events.failed_publishes(), "some agent events were not delivered");
    }
    Ok(code)
}
