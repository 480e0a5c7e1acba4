//! The output of the cost guardian.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One agent's billed cost, broken out for the per-agent cost map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerAgentCost {
    /// Prompt tokens billed.
    pub input_tokens: u64,
    /// Completion tokens billed.
    pub output_tokens: u64,
    /// Estimated USD cost.
    pub cost: f64,
    /// Model identifier used for this agent's invocation.
    pub model: String,
}

/// Forward-looking burn projections.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projections {
    /// Projected monthly spend at the observed per-incident cost.
    pub monthly_burn: f64,
    /// Estimated number of incidents the remaining budget can cover.
    pub incidents_remaining: u64,
}

/// Deterministic output of the cost guardian.
///
/// Produced exactly once per run by a pure function over the run's agent
/// outputs and the budget carried in from entry. `budget_exceeded` is a
/// signal only — it never aborts or alters the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostGuardianResult {
    /// Sum of every agent's estimated cost, rounded to 6 decimals.
    pub total_cost: f64,
    /// `budget_remaining_before - total_cost`. May be negative.
    pub budget_remaining: f64,
    /// Whether the budget was (or is now) exceeded. Signal only.
    pub budget_exceeded: bool,
    /// Per-agent cost breakdown, keyed by `agent_id`.
    pub per_agent_cost: BTreeMap<String, PerAgentCost>,
    /// Burn-rate projections.
    pub projections: Projections,
    /// ISO-8601 timestamp of when the cost guardian ran.
    pub timestamp: String,
}
