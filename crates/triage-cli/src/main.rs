use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod fake_transport;
mod output;

use commands::{checkpoints, replay, resume, run};
use triage_observability::{init_logging, ObservabilityConfig};

/// triage - deterministic multi-agent incident-orchestrator CLI
#[derive(Parser)]
#[command(name = "triage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run and inspect incident-triage orchestrations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive one incident through the orchestrator.
    Run(run::RunArgs),

    /// Resume a session from its latest checkpoint.
    Resume(resume::ResumeArgs),

    /// Inspect a session's checkpoint history.
    Checkpoints(checkpoints::CheckpointsArgs),

    /// Recompute and verify a session's recorded deterministic hashes.
    Replay(replay::ReplayArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&ObservabilityConfig::default());

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Resume(args) => resume::run(args).await,
        Commands::Checkpoints(args) => checkpoints::run(args).await,
        Commands::Replay(args) => replay::run(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_parses_known_subcommands() {
        let cli = Cli::try_parse_from(["triage", "run", "--incident-id", "INC-1"]).expect("parse run");
        assert!(matches!(cli.command, Commands::Run(_)));

        let cli = Cli::try_parse_from(["triage", "checkpoints", "list", "--session-id", "s1"])
            .expect("parse checkpoints list");
        assert!(matches!(cli.command, Commands::Checkpoints(_)));
    }

    #[test]
    fn run_requires_incident_id() {
        assert!(Cli::try_parse_from(["triage", "run"]).is_err());
    }
}
