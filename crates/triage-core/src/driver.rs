//! The graph driver: the fixed linear topology, its checkpoint-based
//! crash-resume, and the public terminal output.
//!
//! `ENTRY -> signal-intelligence -> historical-pattern -> change-intelligence
//! -> risk-blast-radius -> knowledge-rag -> response-strategy -> consensus
//! -> cost-guardian -> TERMINAL`. The sequence is hard-coded at deploy
//! time; this module only drives it.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use triage_checkpoint::{format_checkpoint_id, Checkpointer};
use triage_observability::ObservabilityPlane;
use triage_types::{
    AgentInput, AgentOutput, AgentStatus, ConsensusResult, CostGuardianResult, ExecutionTraceEntry,
    GraphState, StructuredError, TraceStatus, AGENT_IDS,
};

use crate::config::OrchestratorConfig;
use crate::error::{CoreError, CoreResult};
use crate::transport::AgentTransport;
use crate::{consensus, cost_guardian, invoker};

const MAX_BACKOFF_SECS: u32 = 4;

/// The transport-neutral invocation event.
///
/// `execution_id`, `session_id`, and `timestamp` are synthesized
/// deterministically when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentEvent {
    pub incident_id: String,
    pub evidence_bundle: Value,
    pub timestamp: Option<String>,
    pub execution_id: Option<String>,
    pub session_id: Option<String>,
    pub budget_remaining: Option<f64>,
    pub context: Option<Value>,
    pub replay_metadata: Option<Value>,
}

/// The `{unified, confidence, agreement_level, conflicts_detected,
/// minority_opinions}` summary embedded in the terminal output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSummary {
    pub unified: String,
    pub confidence: f64,
    pub agreement_level: f64,
    pub conflicts_detected: usize,
    pub minority_opinions: Vec<String>,
}

/// The `{duration_ms, agents_succeeded, agents_failed, total_retries,
/// errors_count}` summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub duration_ms: u64,
    pub agents_succeeded: usize,
    pub agents_failed: usize,
    pub total_retries: u32,
    pub errors_count: usize,
}

/// The structured object returned after TERMINAL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalOutput {
    pub incident_id: String,
    pub recommendation: RecommendationSummary,
    pub agent_outputs: BTreeMap<String, AgentOutput>,
    pub consensus: ConsensusResult,
    pub cost: CostGuardianResult,
    pub execution_summary: ExecutionSummary,
    pub execution_trace: Vec<ExecutionTraceEntry>,
    pub errors: Vec<StructuredError>,
    pub timestamp: String,
}

/// Drive one incident through the graph to completion, resuming from the
/// latest checkpoint if `event.session_id` (or its synthesized default)
/// already has one.
pub async fn run(
    event: IncidentEvent,
    entry_time: &str,
    config: &OrchestratorConfig,
    transport: &dyn AgentTransport,
    checkpointer: &dyn Checkpointer,
    observability: &ObservabilityPlane,
) -> CoreResult<TerminalOutput> {
    let session_id = event
        .session_id
        .clone()
        .unwrap_or_else(|| format!("session-{}-{entry_time}", event.incident_id));

    let existing = checkpointer.latest(&session_id).await?;
    let mut sequence = match &existing {
        Some(checkpoint) => checkpoint.checkpoint_id.parse::<u64>().unwrap_or(0) + 1,
        None => 0,
    };

    let mut state = match existing {
        Some(checkpoint) => {
            info!(session_id, resumed_from = %checkpoint.node_name, "resuming from checkpoint");
            checkpoint.state
        }
        None => {
            let state = build_initial_state(&event, &session_id, entry_time, config.default_budget)?;
            checkpointer
                .put(&session_id, &format_checkpoint_id(sequence), "__entry__", &state, entry_time)
                .await?;
            sequence += 1;
            state
        }
    };

    while let Some(node) = state.next_node() {
        state = if AGENT_IDS.contains(&node) {
            let next = invoker::invoke(state, node, config, transport, observability).await?;
            checkpointer
                .put(&session_id, &format_checkpoint_id(sequence), node, &next, &Utc::now().to_rfc3339())
                .await?;
            sequence += 1;

            if !next.agent_completed(node) {
                let backoff_secs = 2_u32.saturating_pow(next.retry_attempt(node)).min(MAX_BACKOFF_SECS);
                tokio::time::sleep(Duration::from_secs(u64::from(backoff_secs))).await;
            }
            next
        } else if node == "consensus" {
            let next = consensus::run(state, config);
            checkpointer
                .put(&session_id, &format_checkpoint_id(sequence), "consensus", &next, &Utc::now().to_rfc3339())
                .await?;
            sequence += 1;
            next
        } else {
            let next = cost_guardian::run(state, config);
            checkpointer
                .put(&session_id, &format_checkpoint_id(sequence), "cost-guardian", &next, &Utc::now().to_rfc3339())
                .await?;
            sequence += 1;
            next
        };
    }

    Ok(terminal_output(&state))
}

fn build_initial_state(
    event: &IncidentEvent,
    session_id: &str,
    entry_time: &str,
    default_budget: f64,
) -> CoreResult<GraphState> {
    if event.incident_id.is_empty() {
        return Err(CoreError::EntryValidation { reason: "incident_id must not be empty".to_string() });
    }
    match &event.evidence_bundle {
        Value::Object(map) if !map.is_empty() => {}
        _ => {
            return Err(CoreError::EntryValidation {
                reason: "evidence_bundle must be a non-empty JSON object".to_string(),
            })
        }
    }
    let budget_remaining = event.budget_remaining.unwrap_or(default_budget);
    if budget_remaining < 0.0 {
        return Err(CoreError::EntryValidation { reason: "budget_remaining must be >= 0".to_string() });
    }
    if session_id.is_empty() {
        return Err(CoreError::EntryValidation { reason: "session_id must not be empty".to_string() });
    }

    let timestamp = event.timestamp.clone().unwrap_or_else(|| entry_time.to_string());
    let execution_id = event
        .execution_id
        .clone()
        .unwrap_or_else(|| format!("exec-{}-{timestamp}", event.incident_id));

    let input = AgentInput::new(
        event.incident_id.clone(),
        event.evidence_bundle.clone(),
        timestamp,
        execution_id,
        session_id.to_string(),
        event.context.clone(),
        event.replay_metadata.clone(),
    )
    .map_err(|e| CoreError::EntryValidation { reason: e.to_string() })?;

    let state = GraphState::new(input, budget_remaining, entry_time.to_string());
    Ok(state.with_trace(ExecutionTraceEntry::new("__entry__", entry_time.to_string(), TraceStatus::Started)))
}

fn terminal_output(state: &GraphState) -> TerminalOutput {
    assert!(state.is_terminal_ready(), "terminal_output requires a terminal-ready state");
    let consensus = state.consensus.clone().expect("terminal-ready state has consensus");
    let cost = state.cost_guardian.clone().expect("terminal-ready state has cost_guardian");

    let agents_succeeded = state.hypotheses.values().filter(|o| o.status != AgentStatus::Failure).count();
    let agents_failed = state.hypotheses.values().filter(|o| o.status == AgentStatus::Failure).count();
    let total_retries: u32 = state.retry_count.values().sum();

    let now = Utc::now();
    let duration_ms = chrono::DateTime::parse_from_rfc3339(&state.start_timestamp)
        .map(|started| (now - started.with_timezone(&Utc)).num_milliseconds().max(0) as u64)
        .unwrap_or(0);

    TerminalOutput {
        incident_id: state.agent_input.incident_id.clone(),
        recommendation: RecommendationSummary {
            unified: consensus.unified_recommendation.clone(),
            confidence: consensus.aggregated_confidence,
            agreement_level: consensus.agreement_level,
            conflicts_detected: consensus.conflicts_detected.len(),
            minority_opinions: consensus.minority_opinions.clone(),
        },
        agent_outputs: state.hypotheses.clone(),
        consensus,
        cost,
        execution_summary: ExecutionSummary {
            duration_ms,
            agents_succeeded,
            agents_failed,
            total_retries,
            errors_count: state.errors.len(),
        },
        execution_trace: state.execution_trace.clone(),
        errors: state.errors.clone(),
        timestamp: now.to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use triage_checkpoint::MemoryCheckpointer;

    struct ScriptedTransport {
        responses: std::sync::Mutex<BTreeMap<String, Vec<crate::transport::TransportResult>>>,
    }

    impl ScriptedTransport {
        fn always_success() -> Self {
            let mut responses = BTreeMap::new();
            for agent_id in AGENT_IDS {
                responses.insert(agent_id.to_string(), vec![Ok(success_response())]);
            }
            Self { responses: std::sync::Mutex::new(responses) }
        }
    }

    fn success_response() -> crate::transport::AgentResponse {
        crate::transport::AgentResponse {
            text: json!({
                "confidence": 0.8,
                "status": "SUCCESS",
                "disclaimer": triage_types::HYPOTHESIS_DISCLAIMER_TOKEN,
                "findings": {"recommendations": [{"type": "INVESTIGATION", "description": "check connection pool"}]}
            })
            .to_string(),
            model_id: "demo-model".to_string(),
            model_version: "1".to_string(),
            input_tokens: 100,
            output_tokens: 50,
            guardrail: None,
        }
    }

    #[async_trait::async_trait]
    impl AgentTransport for ScriptedTransport {
        async fn invoke(&self, request: crate::transport::AgentRequest) -> crate::transport::TransportResult {
            let mut responses = self.responses.lock().unwrap();
            let queue = responses.entry(request.agent_id.clone()).or_default();
            if queue.is_empty() {
                Ok(success_response())
            } else {
                queue.remove(0)
            }
        }
    }

    fn event() -> IncidentEvent {
        IncidentEvent {
            incident_id: "INC-T1".to_string(),
            evidence_bundle: json!({"signals": [{"metric": "CPU", "value": 95.5}]}),
            timestamp: None,
            execution_id: None,
            session_id: Some("session-s1".to_string()),
            budget_remaining: Some(5.0),
            context: None,
            replay_metadata: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_completes_with_six_agents_and_a_unified_recommendation() {
        let config = OrchestratorConfig::demo();
        let transport = ScriptedTransport::always_success();
        let checkpointer = MemoryCheckpointer::new();
        let observability = ObservabilityPlane::in_memory();

        let output = run(event(), "2026-07-27T00:00:00Z", &config, &transport, &checkpointer, &observability)
            .await
            .unwrap();

        assert_eq!(output.agent_outputs.len(), 6);
        assert_eq!(output.execution_summary.agents_succeeded, 6);
        assert_eq!(output.execution_summary.agents_failed, 0);
        assert!(output.recommendation.unified.starts_with("PRIMARY: check connection pool"));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_incident_id_is_rejected_before_any_checkpoint() {
        let config = OrchestratorConfig::demo();
        let transport = ScriptedTransport::always_success();
        let checkpointer = MemoryCheckpointer::new();
        let observability = ObservabilityPlane::in_memory();

        let mut bad_event = event();
        bad_event.incident_id = String::new();

        let result = run(bad_event, "2026-07-27T00:00:00Z", &config, &transport, &checkpointer, &observability).await;
        assert!(matches!(result, Err(CoreError::EntryValidation { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_agent_endpoint_aborts_the_run() {
        let mut config = OrchestratorConfig::demo();
        config.agent_endpoints.remove("signal-intelligence");
        let transport = ScriptedTransport::always_success();
        let checkpointer = MemoryCheckpointer::new();
        let observability = ObservabilityPlane::in_memory();

        let result = run(event(), "2026-07-27T00:00:00Z", &config, &transport, &checkpointer, &observability).await;
        assert!(matches!(result, Err(CoreError::MissingEndpoint { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn crash_resume_produces_identical_consensus_and_cost() {
        let config = OrchestratorConfig::demo();
        let observability = ObservabilityPlane::in_memory();

        let uninterrupted_checkpointer = MemoryCheckpointer::new();
        let mut uninterrupted_event = event();
        uninterrupted_event.session_id = Some("session-uninterrupted".to_string());
        let uninterrupted = run(
            uninterrupted_event,
            "2026-07-27T00:00:00Z",
            &config,
            &ScriptedTransport::always_success(),
            &uninterrupted_checkpointer,
            &observability,
        )
        .await
        .unwrap();

        // Simulate a crash after three agents by pre-seeding a checkpoint
        // store with a state that already has three hypotheses written.
        let resumed_checkpointer = MemoryCheckpointer::new();
        let mut partial_event = event();
        partial_event.session_id = Some("session-s6".to_string());
        let mut partial_state =
            build_initial_state(&partial_event, "session-s6", "2026-07-27T00:00:00Z", config.default_budget).unwrap();
        let transport = ScriptedTransport::always_success();
        for agent_id in &AGENT_IDS[..3] {
            partial_state = invoker::invoke(partial_state, *agent_id, &config, &transport, &observability)
                .await
                .unwrap();
        }
        resumed_checkpointer
            .put("session-s6", &format_checkpoint_id(0), "risk-blast-radius", &partial_state, "2026-07-27T00:00:01Z")
            .await
            .unwrap();

        let resumed = run(
            partial_event,
            "2026-07-27T00:00:00Z",
            &config,
            &ScriptedTransport::always_success(),
            &resumed_checkpointer,
            &observability,
        )
        .await
        .unwrap();

        assert_eq!(resumed.agent_outputs.len(), 6);
        assert_eq!(
            resumed.consensus.aggregated_confidence,
            uninterrupted.consensus.aggregated_confidence
        );
        assert_eq!(resumed.cost.total_cost, uninterrupted.cost.total_cost);
    }

    struct AlwaysFailsTraceSink;
    #[async_trait::async_trait]
    impl triage_observability::TraceSink for AlwaysFailsTraceSink {
        async fn record(&self, _event: triage_observability::LlmTraceEvent) -> triage_observability::Result<()> {
            Err(triage_observability::Error::SinkRejected("simulated outage".into()))
        }
    }

    struct AlwaysFailsViolationSink;
    #[async_trait::async_trait]
    impl triage_observability::ViolationSink for AlwaysFailsViolationSink {
        async fn record(&self, _violation: triage_observability::GuardrailViolation) -> triage_observability::Result<()> {
            Err(triage_observability::Error::SinkRejected("simulated outage".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn total_observability_failure_leaves_the_terminal_output_unchanged() {
        let config = OrchestratorConfig::demo();
        let checkpointer = MemoryCheckpointer::new();
        let failing_observability = ObservabilityPlane {
            traces: std::sync::Arc::new(AlwaysFailsTraceSink),
            violations: std::sync::Arc::new(AlwaysFailsViolationSink),
            metrics: std::sync::Arc::new(triage_observability::MetricsRegistry::new()),
        };

        let mut failing_event = event();
        failing_event.session_id = Some("session-failing-observability".to_string());
        let failing_output = run(
            failing_event,
            "2026-07-27T00:00:00Z",
            &config,
            &ScriptedTransport::always_success(),
            &checkpointer,
            &failing_observability,
        )
        .await
        .unwrap();

        let working_checkpointer = MemoryCheckpointer::new();
        let working_observability = ObservabilityPlane::in_memory();
        let mut working_event = event();
        working_event.session_id = Some("session-working-observability".to_string());
        let working_output = run(
            working_event,
            "2026-07-27T00:00:00Z",
            &config,
            &ScriptedTransport::always_success(),
            &working_checkpointer,
            &working_observability,
        )
        .await
        .unwrap();

        assert_eq!(failing_output.agent_outputs.len(), 6);
        assert_eq!(
            failing_output.consensus.aggregated_confidence,
            working_output.consensus.aggregated_confidence
        );
        assert_eq!(failing_output.cost.total_cost, working_output.cost.total_cost);
        assert_eq!(failing_output.recommendation.unified, working_output.recommendation.unified);
    }
}
