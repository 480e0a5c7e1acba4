//! Human- and machine-readable rendering of a run's terminal output and
//! its checkpoint history.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use triage_checkpoint::CheckpointMetadata;
use triage_core::TerminalOutput;

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "ERROR:".bright_red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "WARNING:".bright_yellow().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".bright_green().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".bright_blue().bold(), msg);
}

/// Render a completed run as colored, human-readable text.
pub fn print_terminal_output(output: &TerminalOutput) {
    println!();
    println!("{} {}", "Incident:".bold(), output.incident_id);
    println!(
        "{} confidence={:.4} agreement={:.4} conflicts={}",
        "Recommendation:".bold(),
        output.recommendation.confidence,
        output.recommendation.agreement_level,
        output.recommendation.conflicts_detected,
    );
    println!("  {}", output.recommendation.unified);
    if !output.recommendation.minority_opinions.is_empty() {
        println!("{}", "Minority opinions:".dimmed());
        for opinion in &output.recommendation.minority_opinions {
            println!("  - {}", opinion.dimmed());
        }
    }

    println!();
    println!(
        "{} succeeded={} failed={} retries={} cost=${:.6} budget_remaining=${:.6}{}",
        "Summary:".bold(),
        output.execution_summary.agents_succeeded,
        output.execution_summary.agents_failed,
        output.execution_summary.total_retries,
        output.cost.total_cost,
        output.cost.budget_remaining,
        if output.cost.budget_exceeded { format!(" {}", "BUDGET EXCEEDED".bright_red().bold()) } else { String::new() },
    );

    if !output.errors.is_empty() {
        println!("{}", "Errors:".bright_yellow().bold());
        for error in &output.errors {
            println!("  - {} [{:?}]: {}", error.agent_id, error.error_code, error.message);
        }
    }
}

/// Render a completed run as pretty-printed JSON.
pub fn print_terminal_output_json(output: &TerminalOutput) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

/// Render a list of checkpoint metadata as a table.
pub fn print_checkpoint_table(checkpoints: &[CheckpointMetadata]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["checkpoint_id", "node_name", "created_at"]);
    for checkpoint in checkpoints {
        table.add_row(vec![checkpoint.checkpoint_id.clone(), checkpoint.node_name.clone(), checkpoint.created_at.clone()]);
    }
    println!("{table}");
}
