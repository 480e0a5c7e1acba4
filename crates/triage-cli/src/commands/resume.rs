//! Resume a session that already has at least one checkpoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use triage_checkpoint::FileCheckpointer;
use triage_core::{driver, OrchestratorConfig};
use triage_observability::ObservabilityPlane;

use crate::fake_transport::FakeAgentTransport;
use crate::output::{print_terminal_output, print_terminal_output_json};

#[derive(Args)]
pub struct ResumeArgs {
    /// Session to resume.
    #[arg(long)]
    session_id: String,

    /// Optional TOML configuration file; falls back to a demo config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding checkpoint files.
    #[arg(long, default_value = "./triage-checkpoints")]
    checkpoint_dir: PathBuf,

    /// Print the terminal output as JSON instead of a human summary.
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ResumeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            let document = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            OrchestratorConfig::from_toml_str(&document)
                .context("failed to parse config file")?
                .apply_env_overrides()
        }
        None => OrchestratorConfig::demo().apply_env_overrides(),
    };

    let checkpointer = FileCheckpointer::new(&args.checkpoint_dir);
    let checkpoint = {
        use triage_checkpoint::Checkpointer;
        checkpointer
            .latest(&args.session_id)
            .await
            .context("failed to load latest checkpoint")?
            .with_context(|| format!("no checkpoint found for session '{}'", args.session_id))?
    };

    // incident_id/evidence_bundle are only consulted when no checkpoint
    // exists yet; resuming always finds one, so these are placeholders.
    let event = driver::IncidentEvent {
        incident_id: checkpoint.state.agent_input.incident_id.clone(),
        evidence_bundle: Value::Object(Default::default()),
        timestamp: None,
        execution_id: None,
        session_id: Some(args.session_id),
        budget_remaining: None,
        context: None,
        replay_metadata: None,
    };

    let transport = FakeAgentTransport::new();
    let observability = ObservabilityPlane::in_memory();
    let entry_time = chrono::Utc::now().to_rfc3339();

    let output = driver::run(event, &entry_time, &config, &transport, &checkpointer, &observability)
        .await
        .context("orchestration run failed")?;

    if args.json {
        print_terminal_output_json(&output)?;
    } else {
        print_terminal_output(&output);
    }
    Ok(())
}
