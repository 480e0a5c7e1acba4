//! Drive one incident through the orchestrator end to end.

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
pub struct RunArgs {
    /// Incident identifier.
    #[arg(long)]
    incident_id: String,

    /// Path to a JSON file holding the evidence bundle. Defaults to `{}`.
    #[arg(long)]
    evidence: Option<PathBuf>,

    /// Resume (or start) this session id. Defaults to a fresh one derived
    /// from `incident_id` and the current run.
    #[arg(long)]
    session_id: Option<String>,

    /// Starting USD budget.
    #[arg(long, default_value_t = 5.0)]
    budget: f64,

    /// Optional TOML configuration file; falls back to a demo config
    /// wired against the fake transport.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for checkpoint files.
    #[arg(long, default_value = "./triage-checkpoints")]
    checkpoint_dir: PathBuf,

    /// Print the terminal output as JSON instead of a human summary.
    #[arg(long)]
    json: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let evidence_bundle: Value = match &args.evidence {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read evidence file '{}'", path.display()))?;
            serde_json::from_slice(&bytes).context("evidence file is not valid JSON")?
        }
        None => Value::Object(Default::default()),
    };

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

    let event = driver::IncidentEvent {
        incident_id: args.incident_id,
        evidence_bundle,
        timestamp: None,
        execution_id: None,
        session_id: args.session_id,
        budget_remaining: Some(args.budget),
        context: None,
        replay_metadata: None,
    };

    let transport = FakeAgentTransport::new();
    let checkpointer = FileCheckpointer::new(args.checkpoint_dir);
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
