//! The cost guardian.
//!
//! A pure function over the run's agent outputs and incoming budget.
//! `budget_exceeded` is a signal only: it must never change anything else
//! in the same run.

use std::collections::BTreeMap;

use chrono::Utc;
use triage_types::{
    cost::{PerAgentCost, Projections},
    CostGuardianResult, ExecutionTraceEntry, GraphState, TraceStatus,
};

use crate::config::OrchestratorConfig;

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Run the cost guardian over every hypothesis recorded so far and append
/// the result to `state`.
///
/// # Panics
///
/// Panics if `state.cost_guardian` is already set — it is set exactly
/// once per run.
pub fn run(state: GraphState, config: &OrchestratorConfig) -> GraphState {
    let now = Utc::now().to_rfc3339();
    let budget_before = state.budget_remaining;

    let mut per_agent_cost = BTreeMap::new();
    let mut total_cost = 0.0;
    for (agent_id, output) in &state.hypotheses {
        per_agent_cost.insert(
            agent_id.clone(),
            PerAgentCost {
                input_tokens: output.cost.input_tokens,
                output_tokens: output.cost.output_tokens,
                cost: output.cost.estimated_cost,
                model: output.cost.model.clone(),
            },
        );
        total_cost += output.cost.estimated_cost;
    }
    total_cost = round6(total_cost);

    let budget_after = round6(budget_before - total_cost);
    let budget_exceeded = budget_before < 0.0 || total_cost > budget_before;

    let monthly_burn = round6(total_cost * config.incidents_per_day * config.days_per_month);
    let incidents_remaining = if total_cost <= 0.0 || budget_after <= 0.0 {
        0
    } else {
        (budget_after / total_cost).floor() as u64
    };

    let result = CostGuardianResult {
        total_cost,
        budget_remaining: budget_after,
        budget_exceeded,
        per_agent_cost,
        projections: Projections { monthly_burn, incidents_remaining },
        timestamp: now.clone(),
    };

    state
        .with_trace(
            ExecutionTraceEntry::new("cost-guardian", now, TraceStatus::Completed).with_metadata(
                serde_json::json!({
                    "total_cost": result.total_cost,
                    "budget_exceeded": result.budget_exceeded,
                }),
            ),
        )
        .with_cost_guardian(result)
}
