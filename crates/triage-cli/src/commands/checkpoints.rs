//! Inspect a session's checkpoint history.
//!
//! The checkpoint store's public contract is deliberately thin
//! (`put`/`latest`/`list`) — there is no "fetch checkpoint N" operation,
//! so `show` can only ever render the latest checkpoint's full state;
//! `list` renders every checkpoint's metadata.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use triage_checkpoint::{Checkpointer, FileCheckpointer};

use crate::output::{print_checkpoint_table, print_info};

#[derive(Args)]
pub struct CheckpointsArgs {
    #[command(subcommand)]
    command: CheckpointsCommand,
}

#[derive(Subcommand)]
enum CheckpointsCommand {
    /// List checkpoints for a session, most recent first.
    List {
        #[arg(long)]
        session_id: String,
        #[arg(long, default_value = "./triage-checkpoints")]
        checkpoint_dir: PathBuf,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show the full `GraphState` recorded at the latest checkpoint.
    Show {
        #[arg(long)]
        session_id: String,
        #[arg(long, default_value = "./triage-checkpoints")]
        checkpoint_dir: PathBuf,
    },
}

pub async fn run(args: CheckpointsArgs) -> Result<()> {
    match args.command {
        CheckpointsCommand::List { session_id, checkpoint_dir, limit } => {
            let store = FileCheckpointer::new(checkpoint_dir);
            let checkpoints = store.list(&session_id, limit).await.context("failed to list checkpoints")?;
            if checkpoints.is_empty() {
                print_info(&format!("no checkpoints found for session '{session_id}'"));
                return Ok(());
            }
            print_checkpoint_table(&checkpoints);
            Ok(())
        }
        CheckpointsCommand::Show { session_id, checkpoint_dir } => {
            let store = FileCheckpointer::new(checkpoint_dir);
            let checkpoint = store
                .latest(&session_id)
                .await
                .context("failed to load latest checkpoint")?
                .with_context(|| format!("no checkpoint found for session '{session_id}'"))?;
            println!("{}", serde_json::to_string_pretty(&checkpoint)?);
            Ok(())
        }
    }
}
