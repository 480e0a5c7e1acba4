//! Errors that can abort a run outright.
//!
//! Everything else — agent failures, schema violations, guardrail blocks —
//! is absorbed into the terminal output as failure hypotheses plus
//! `errors` entries. Only two things can abort: a bad entry before the
//! first checkpoint, and a deployment-time configuration bug.

use thiserror::Error;

/// Fatal, run-aborting failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Entry validation failed before any checkpoint existed to resume
    /// from.
    #[error("entry validation failed: {reason}")]
    EntryValidation {
        /// Human-readable detail.
        reason: String,
    },

    /// An agent's remote endpoint identifiers are unset — a deployment
    /// bug, not a runtime fault.
    #[error("agent '{agent_id}' has no configured endpoint")]
    MissingEndpoint {
        /// Which agent slot was misconfigured.
        agent_id: String,
    },

    /// The checkpoint store itself failed (distinct from an agent/consensus
    /// failure — this is infrastructure, not advisory data).
    #[error("checkpoint store error: {0}")]
    Checkpoint(#[from] triage_checkpoint::Error),
}

/// Result type used by the graph driver.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
