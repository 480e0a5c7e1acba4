//! Recompute and verify the deterministic hash recorded against a
//! session's latest checkpoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use triage_checkpoint::{Checkpointer, FileCheckpointer};
use triage_types::hash::{compute_deterministic_hash, FAILURE_HASH};

use crate::output::{print_error, print_info, print_success};

#[derive(Args)]
pub struct ReplayArgs {
    /// Session whose latest checkpoint should be replay-verified.
    #[arg(long)]
    session_id: String,

    /// Directory holding checkpoint files.
    #[arg(long, default_value = "./triage-checkpoints")]
    checkpoint_dir: PathBuf,
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let store = FileCheckpointer::new(args.checkpoint_dir);
    let checkpoint = store
        .latest(&args.session_id)
        .await
        .context("failed to load latest checkpoint")?
        .with_context(|| format!("no checkpoint found for session '{}'", args.session_id))?;

    let state = checkpoint.state;
    if state.hypotheses.is_empty() {
        print_info(&format!("session '{}' has no recorded agent outputs yet", args.session_id));
        return Ok(());
    }

    let mut mismatches = 0;
    for (agent_id, output) in &state.hypotheses {
        if output.replay_metadata.deterministic_hash == FAILURE_HASH {
            continue;
        }
        let recomputed =
            compute_deterministic_hash(&state.agent_input, &output.findings, output.confidence);
        if recomputed == output.replay_metadata.deterministic_hash {
            print_success(&format!("{agent_id}: hash matches"));
        } else {
            mismatches += 1;
            print_error(&format!(
                "{agent_id}: hash mismatch (recorded {}, recomputed {})",
                output.replay_metadata.deterministic_hash, recomputed
            ));
        }
    }

    if mismatches > 0 {
        anyhow::bail!("{mismatches} agent(s) failed replay verification");
    }
    Ok(())
}
