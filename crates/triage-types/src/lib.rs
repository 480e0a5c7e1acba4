//! Immutable value objects shared by every component of the incident
//! orchestrator.
//!
//! Every type in this crate is a plain value: once constructed it is never
//! mutated. Nodes that need to "update" a [`state::GraphState`] build a new
//! one from the old (see [`state::GraphState::with_hypothesis`] and
//! friends) rather than writing through a `&mut` reference. This is load
//! bearing for replay determinism under crash-resume — see the orchestrator
//! design notes for why a partially-applied mutation would corrupt a
//! checkpoint.

pub mod consensus;
pub mod cost;
pub mod error;
pub mod hash;
pub mod input;
pub mod output;
pub mod state;
pub mod structured_error;
pub mod trace;

pub use consensus::{ConflictRecord, ConflictType, ConsensusResult, QualityMetrics};
pub use cost::{CostGuardianResult, PerAgentCost, Projections};
pub use error::{TypeError, TypeResult};
pub use input::AgentInput;
pub use output::{AgentCost, AgentOutput, AgentStatus, ReplayMetadata};
pub use state::{GraphState, AGENT_IDS};
pub use structured_error::{ErrorCode, StructuredError};
pub use trace::{ExecutionTraceEntry, TraceStatus};

/// Literal token that must appear somewhere in every agent's disclaimer.
///
/// Advisory hypotheses only, never authoritative actions — this string is
/// the contract's load-bearing reminder of that, and its presence is
/// mechanically checked during output validation.
pub const HYPOTHESIS_DISCLAIMER_TOKEN: &str = "HYPOTHESIS_ONLY_NOT_AUTHORITATIVE";

/// Schema version stamped into every [`output::ReplayMetadata`].
pub const SCHEMA_VERSION: u32 = 1;
