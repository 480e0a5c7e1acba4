//! The aggregate, run-scoped state threaded through every node.
//!
//! `GraphState` is the one type every component touches, and it is the
//! type whose immutability carries the whole replay-determinism story.
//! No method here takes `&mut self`: every "update" consumes `self` by
//! value and returns a new `GraphState` with one additional fact recorded.
//! Maps and lists are append-only — nothing is ever removed or
//! overwritten.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consensus::ConsensusResult;
use crate::cost::CostGuardianResult;
use crate::input::AgentInput;
use crate::output::AgentOutput;
use crate::structured_error::StructuredError;
use crate::trace::ExecutionTraceEntry;

/// The fixed, deploy-time sequence of agent slots.
///
/// The graph driver walks this array in order; no other ordering is ever
/// produced or consulted.
pub const AGENT_IDS: [&str; 6] = [
    "signal-intelligence",
    "historical-pattern",
    "change-intelligence",
    "risk-blast-radius",
    "knowledge-rag",
    "response-strategy",
];

/// The run-scoped aggregate state.
///
/// Constructed once at graph entry from a validated [`AgentInput`] and
/// threaded, by value, through every node. Every `with_*` method below
/// returns a new `GraphState`; none mutate `self` in place, and none ever
/// remove or overwrite a previously recorded fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    /// Frozen at entry; identical byte-for-byte across every state derived
    /// from the same run.
    pub agent_input: AgentInput,
    /// One [`AgentOutput`] per agent, written exactly once per slot.
    /// Additive only.
    pub hypotheses: BTreeMap<String, AgentOutput>,
    /// Set exactly once, by the consensus aggregator.
    pub consensus: Option<ConsensusResult>,
    /// Set exactly once, by the cost guardian.
    pub cost_guardian: Option<CostGuardianResult>,
    /// Single source of truth for remaining budget; updated only by the
    /// cost guardian.
    pub budget_remaining: f64,
    /// Number of retries attempted so far, per agent.
    pub retry_count: BTreeMap<String, u32>,
    /// Append-only causal log of node lifecycle events.
    pub execution_trace: Vec<ExecutionTraceEntry>,
    /// Append-only list of classified agent-invocation failures.
    pub errors: Vec<StructuredError>,
    /// Groups checkpoints belonging to one logical (possibly resumed) run.
    pub session_id: String,
    /// ISO-8601 timestamp of when this run's first checkpoint was written.
    pub start_timestamp: String,
}

impl GraphState {
    /// Construct the initial state at graph entry.
    ///
    /// `budget_remaining` is the run's starting USD budget (default `5.0`
    /// when the invocation event omits it). All collections start empty;
    /// `hypotheses`, `consensus` and `cost_guardian` are filled in by
    /// later nodes.
    pub fn new(agent_input: AgentInput, budget_remaining: f64, start_timestamp: impl Into<String>) -> Self {
        let session_id = agent_input.session_id.clone();
        Self {
            agent_input,
            hypotheses: BTreeMap::new(),
            consensus: None,
            cost_guardian: None,
            budget_remaining,
            retry_count: BTreeMap::new(),
            execution_trace: Vec::new(),
            errors: Vec::new(),
            session_id,
            start_timestamp: start_timestamp.into(),
        }
    }

    /// Has this agent slot already reached a terminal state?
    ///
    /// `completed`/`failed` are both represented by the presence of an
    /// [`AgentOutput`] in `hypotheses` — there is no separate "failed but
    /// still retrying" state once a failure hypothesis has been written.
    pub fn agent_completed(&self, agent_id: &str) -> bool {
        self.hypotheses.contains_key(agent_id)
    }

    /// Current retry attempt for `agent_id` (0 if it has never retried).
    pub fn retry_attempt(&self, agent_id: &str) -> u32 {
        self.retry_count.get(agent_id).copied().unwrap_or(0)
    }

    /// Return a new state with `output` written into `hypotheses[agent_id]`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already occupied — a written hypothesis is
    /// never overwritten, and a caller attempting to do so is a
    /// programming bug in the invoker, not a runtime condition to recover
    /// from.
    pub fn with_hypothesis(mut self, agent_id: impl Into<String>, output: AgentOutput) -> Self {
        let agent_id = agent_id.into();
        assert!(
            !self.hypotheses.contains_key(&agent_id),
            "hypotheses[{agent_id}] was already written and must not be overwritten"
        );
        self.hypotheses.insert(agent_id, output);
        self
    }

    /// Return a new state with `retry_count[agent_id]` incremented by one.
    pub fn with_retry_incremented(mut self, agent_id: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        let attempt = self.retry_count.entry(agent_id).or_insert(0);
        *attempt += 1;
        self
    }

    /// Return a new state with `entry` appended to `execution_trace`.
    pub fn with_trace(mut self, entry: ExecutionTraceEntry) -> Self {
        self.execution_trace.push(entry);
        self
    }

    /// Return a new state with `error` appended to `errors`.
    pub fn with_error(mut self, error: StructuredError) -> Self {
        self.errors.push(error);
        self
    }

    /// Return a new state with `consensus` set.
    ///
    /// # Panics
    ///
    /// Panics if consensus has already been computed for this run —
    /// consensus is set exactly once.
    pub fn with_consensus(mut self, consensus: ConsensusResult) -> Self {
        assert!(
            self.consensus.is_none(),
            "consensus was already set and must not be recomputed"
        );
        self.consensus = Some(consensus);
        self
    }

    /// Return a new state with `cost_guardian` set and `budget_remaining`
    /// updated to match it — the cost guardian is the only component
    /// allowed to change `budget_remaining`.
    ///
    /// # Panics
    ///
    /// Panics if the cost guardian has already run for this run — it is
    /// set exactly once.
    pub fn with_cost_guardian(mut self, result: CostGuardianResult) -> Self {
        assert!(
            self.cost_guardian.is_none(),
            "cost_guardian was already set and must not be recomputed"
        );
        self.budget_remaining = result.budget_remaining;
        self.cost_guardian = Some(result);
        self
    }

    /// Have all six fixed agent slots completed?
    pub fn all_agents_completed(&self) -> bool {
        AGENT_IDS.iter().all(|id| self.agent_completed(id))
    }

    /// Is this run ready for the TERMINAL node?
    pub fn is_terminal_ready(&self) -> bool {
        self.all_agents_completed() && self.consensus.is_some() && self.cost_guardian.is_some()
    }

    /// The next not-yet-completed node name in the fixed topology, or
    /// `None` if the run is ready for TERMINAL.
    pub fn next_node(&self) -> Option<&'static str> {
        for agent_id in AGENT_IDS.iter() {
            if !self.agent_completed(agent_id) {
                return Some(agent_id);
            }
        }
        if self.consensus.is_none() {
            return Some("consensus");
        }
        if self.cost_guardian.is_none() {
            return Some("cost-guardian");
        }
        None
    }
}
