//! The agent invoker — the orchestrator's most complex component.
//!
//! `invoke` wraps one remote agent call end to end: input validation,
//! request assembly, the remote call itself, guardrail handling, response
//! parsing and schema validation, cost extraction, the deterministic hash,
//! and failure classification with retry-or-degrade semantics. It never
//! returns a Rust error for anything recoverable — a failed agent becomes
//! a failure hypothesis, not a propagated error.

use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use triage_observability::ObservabilityPlane;
use triage_types::{
    hash::compute_deterministic_hash, AgentCost, AgentOutput, AgentStatus, ErrorCode,
    ExecutionTraceEntry, GraphState, ReplayMetadata, StructuredError, TraceStatus,
    HYPOTHESIS_DISCLAIMER_TOKEN, SCHEMA_VERSION,
};

use crate::config::OrchestratorConfig;
use crate::error::{CoreError, CoreResult};
use crate::transport::{
    AgentRequest, AgentTransport, GuardrailAction as TransportGuardrailAction, TransportError,
};

/// The outcome of one call attempt, before it is folded into `GraphState`.
enum Attempt {
    Success(AgentOutput),
    Retry,
    Failure { code: ErrorCode, message: String, cost: AgentCost },
}

/// Invoke `agent_id` once against `transport`, returning the new state.
///
/// Callers are the graph driver: on [`Attempt::Retry`] the caller is
/// expected to apply exponential backoff and call `invoke` again —
/// backoff itself lives in the driver, not here.
pub async fn invoke(
    state: GraphState,
    agent_id: &'static str,
    config: &OrchestratorConfig,
    transport: &dyn AgentTransport,
    observability: &ObservabilityPlane,
) -> CoreResult<GraphState> {
    let started_at = Instant::now();
    let retry_attempt = state.retry_attempt(agent_id);
    let now = Utc::now().to_rfc3339();

    let state = state.with_trace(
        ExecutionTraceEntry::new(agent_id, now.clone(), TraceStatus::Started)
            .with_metadata(serde_json::json!({ "retry_attempt": retry_attempt })),
    );

    observability.record_invocation(agent_id).await;

    // Step 2: configuration check. A deployment bug, not a runtime fault —
    // this is one of the two error classes the driver is allowed to abort on.
    let endpoint = config
        .endpoint_for(agent_id)
        .ok_or_else(|| CoreError::MissingEndpoint { agent_id: agent_id.to_string() })?;

    let attempt = run_attempt(&state, agent_id, endpoint, config, transport, observability, &now, started_at)
        .await;

    let duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    let completion_time = Utc::now().to_rfc3339();

    match attempt {
        Attempt::Success(mut output) => {
            output.duration_ms = duration_ms;
            info!(agent_id, confidence = output.confidence, "agent invocation succeeded");
            observability
                .observe_success(duration_ms, output.cost.estimated_cost, output.confidence)
                .await;
            let state = state.with_trace(
                ExecutionTraceEntry::new(agent_id, completion_time, TraceStatus::Completed)
                    .with_duration(duration_ms)
                    .with_metadata(serde_json::json!({
                        "confidence": output.confidence,
                        "status": output.status,
                    })),
            );
            Ok(state.with_hypothesis(agent_id, output))
        }
        Attempt::Retry => {
            warn!(agent_id, retry_attempt, "agent invocation retrying");
            observability.record_retry(agent_id).await;
            let state = state.with_trace(
                ExecutionTraceEntry::new(agent_id, completion_time, TraceStatus::Retrying)
                    .with_duration(duration_ms)
                    .with_metadata(serde_json::json!({ "attempt": retry_attempt })),
            );
            Ok(state.with_retry_incremented(agent_id))
        }
        Attempt::Failure { code, message, cost } => {
            warn!(agent_id, ?code, %message, "agent invocation failed terminally");
            observability.record_failure(agent_id).await;
            let output = AgentOutput {
                agent_id: agent_id.to_string(),
                agent_version: endpoint.alias_id.clone(),
                execution_id: state.agent_input.execution_id.clone(),
                timestamp: completion_time.clone(),
                duration_ms,
                status: AgentStatus::Failure,
                confidence: 0.0,
                reasoning: format!("Agent failed: {message}"),
                disclaimer: HYPOTHESIS_DISCLAIMER_TOKEN.to_string(),
                findings: serde_json::json!({ "error": code }),
                citations: None,
                cost,
                error: Some(StructuredError::new(
                    agent_id,
                    code,
                    message,
                    completion_time.clone(),
                    retry_attempt,
                    None,
                )),
                replay_metadata: ReplayMetadata {
                    deterministic_hash: triage_types::hash::FAILURE_HASH.to_string(),
                    schema_version: SCHEMA_VERSION,
                },
            };
            let error = output.error.clone().expect("failure outputs always carry an error");
            let state = state
                .with_trace(
                    ExecutionTraceEntry::new(agent_id, completion_time, TraceStatus::Failed)
                        .with_duration(duration_ms)
                        .with_metadata(serde_json::json!({ "error_code": error.error_code })),
                )
                .with_error(error);
            Ok(state.with_hypothesis(agent_id, output))
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_attempt(
    state: &GraphState,
    agent_id: &'static str,
    endpoint: &crate::config::AgentEndpoint,
    config: &OrchestratorConfig,
    transport: &dyn AgentTransport,
    observability: &ObservabilityPlane,
    now: &str,
    started_at: Instant,
) -> Attempt {
    // Step 3: input validation (defense in depth; the driver already
    // validated at entry, but a resumed or malformed checkpoint should not
    // silently propagate a bad evidence bundle into a remote call).
    if let Some(reason) = invalid_input_reason(state) {
        return terminal_failure(ErrorCode::InvalidInput, reason);
    }

    // Step 4: request assembly.
    let request = AgentRequest {
        agent_id: agent_id.to_string(),
        alias_id: endpoint.alias_id.clone(),
        session_id: state.agent_input.session_id.clone(),
        incident_id: state.agent_input.incident_id.clone(),
        evidence_bundle: state.agent_input.evidence_bundle.clone(),
        timestamp: state.agent_input.timestamp.clone(),
        execution_id: state.agent_input.execution_id.clone(),
        budget_remaining: state.budget_remaining,
        guardrail_id: config.guardrail_id.clone(),
    };

    // Step 5: the remote call, under the configured per-call timeout.
    let response = match tokio::time::timeout(config.per_call_timeout(), transport.invoke(request))
        .await
    {
        Err(_elapsed) => {
            return classify_retry_or_fail(state, agent_id, config, ErrorCode::Timeout, "per-call timeout elapsed".into())
        }
        Ok(Err(transport_error)) => {
            let (code, message) = classify_transport_error(transport_error);
            return classify_retry_or_fail(state, agent_id, config, code, message);
        }
        Ok(Ok(response)) => response,
    };

    // Step 6: guardrail check on the response.
    if let Some(signal) = &response.guardrail {
        let confidence = signal
            .confidence
            .unwrap_or(triage_observability::ViolationDetail::DEFAULT_CONFIDENCE);
        let violation_action = match signal.action {
            TransportGuardrailAction::Blocked => {
                triage_observability::GuardrailAction::Block
            }
            TransportGuardrailAction::Warn => triage_observability::GuardrailAction::Warn,
        };
        let retry_attempt = state.retry_attempt(agent_id);
        let violation = triage_observability::GuardrailViolation::build(
            format!("{}-{}-guardrail-{}", state.agent_input.execution_id, agent_id, retry_attempt),
            now.to_string(),
            format!("{}-{}", state.agent_input.execution_id, agent_id),
            agent_id,
            state.agent_input.incident_id.clone(),
            state.agent_input.execution_id.clone(),
            triage_observability::ViolationDetail {
                violation_type: signal.violation_type.clone().unwrap_or_else(|| "UNSPECIFIED".into()),
                action: violation_action,
                category: signal.category.clone().unwrap_or_else(|| "safety".into()),
                threshold: 0.5,
                confidence,
            },
            &serde_json::to_string(&state.agent_input.evidence_bundle).unwrap_or_default(),
            &response.text,
            triage_observability::ViolationResponse {
                blocked: matches!(signal.action, TransportGuardrailAction::Blocked),
                retry_allowed: false,
            },
            None,
        );
        observability.emit_violation(violation).await;
        observability
            .record_guardrail_violation(
                agent_id,
                signal.violation_type.as_deref().unwrap_or("UNSPECIFIED"),
                match signal.action {
                    TransportGuardrailAction::Blocked => "BLOCK",
                    TransportGuardrailAction::Warn => "WARN",
                },
            )
            .await;

        if matches!(signal.action, TransportGuardrailAction::Blocked) {
            let cost = extract_cost(config, &response);
            return Attempt::Failure {
                code: ErrorCode::GuardrailBlocked,
                message: "response blocked by safety guardrail".to_string(),
                cost,
            };
        }
    }

    // Step 7: stream assembly (already concatenated by the transport).
    if response.text.trim().is_empty() {
        return terminal_failure_with_cost(
            ErrorCode::OutputValidationFailed,
            "transport returned an empty response".to_string(),
            extract_cost(config, &response),
        );
    }

    // Step 8: parse.
    let parsed: Value = match serde_json::from_str(&response.text) {
        Ok(value) => value,
        Err(err) => {
            return terminal_failure_with_cost(
                ErrorCode::OutputValidationFailed,
                format!("response was not valid JSON: {err}"),
                extract_cost(config, &response),
            )
        }
    };

    // Step 9: output validation.
    let cost = extract_cost(config, &response);
    match validate_output(&parsed) {
        Ok((confidence, status, findings)) => {
            if confidence < config.min_confidence {
                return terminal_failure_with_cost(
                    ErrorCode::LowConfidence,
                    format!("confidence {confidence} below configured minimum {}", config.min_confidence),
                    cost,
                );
            }

            // Step 11: deterministic hash.
            let deterministic_hash =
                compute_deterministic_hash(&state.agent_input, &findings, confidence);

            // Step 12: out-of-band trace emission (best-effort).
            let (input_cost, output_cost) = extract_cost_breakdown(config, &response);
            let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
            let trace_id = format!("{}-{agent_id}", state.agent_input.execution_id);
            let event = triage_observability::LlmTraceEvent::build(triage_observability::trace::RawTrace {
                trace_id,
                incident_id: &state.agent_input.incident_id,
                execution_id: &state.agent_input.execution_id,
                agent_id,
                model_id: &response.model_id,
                model_version: &response.model_version,
                prompt: &state.agent_input.evidence_bundle,
                prompt_tokens: response.input_tokens,
                response: &parsed,
                response_tokens: response.output_tokens,
                finish_reason: "stop",
                latency_ms,
                input_cost,
                output_cost,
                total_cost: cost.estimated_cost,
                retry_count: state.retry_attempt(agent_id),
                guardrails_applied: response
                    .guardrail
                    .as_ref()
                    .map(|g| vec![g.violation_type.clone().unwrap_or_else(|| "UNSPECIFIED".into())])
                    .unwrap_or_default(),
                validation_status: "SCHEMA_VALID",
                timestamp: now.to_string(),
                trace_ttl_days: 90,
            });
            observability.emit_trace(event).await;

            // Step 13: state update (assembled by the caller).
            let reasoning = parsed.get("reasoning").and_then(Value::as_str).unwrap_or_default();
            let disclaimer = parsed
                .get("disclaimer")
                .and_then(Value::as_str)
                .unwrap_or(HYPOTHESIS_DISCLAIMER_TOKEN)
                .to_string();
            let citations = parsed.get("citations").and_then(Value::as_array).map(|list| {
                list.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
            });

            Attempt::Success(AgentOutput {
                agent_id: agent_id.to_string(),
                agent_version: endpoint.alias_id.clone(),
                execution_id: state.agent_input.execution_id.clone(),
                timestamp: now.to_string(),
                duration_ms: latency_ms,
                status,
                confidence,
                reasoning: reasoning.to_string(),
                disclaimer,
                findings,
                citations,
                cost,
                error: None,
                replay_metadata: ReplayMetadata { deterministic_hash, schema_version: SCHEMA_VERSION },
            })
        }
        Err(reason) => terminal_failure_with_cost(ErrorCode::SchemaValidationFailed, reason, cost),
    }
}

fn invalid_input_reason(state: &GraphState) -> Option<String> {
    let input = &state.agent_input;
    if input.incident_id.is_empty() {
        return Some("incident_id is empty".to_string());
    }
    if !input.evidence_bundle.is_object() || input.evidence_bundle.as_object().is_some_and(|m| m.is_empty()) {
        return Some("evidence_bundle is not a non-empty object".to_string());
    }
    if input.timestamp.is_empty() {
        return Some("timestamp is empty".to_string());
    }
    if input.execution_id.is_empty() {
        return Some("execution_id is empty".to_string());
    }
    if input.session_id.is_empty() {
        return Some("session_id is empty".to_string());
    }
    None
}

fn validate_output(parsed: &Value) -> Result<(f64, AgentStatus, Value), String> {
    let confidence = parsed
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or_else(|| "missing or non-numeric 'confidence'".to_string())?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("confidence {confidence} is outside [0.0, 1.0]"));
    }

    let status = parsed
        .get("status")
        .and_then(Value::as_str)
        .and_then(AgentStatus::parse)
        .ok_or_else(|| "missing or unrecognized 'status'".to_string())?;

    let disclaimer = parsed
        .get("disclaimer")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing 'disclaimer'".to_string())?;
    AgentOutput::validate_disclaimer(disclaimer).map_err(|e| e.to_string())?;

    let findings = parsed
        .get("findings")
        .cloned()
        .ok_or_else(|| "missing 'findings'".to_string())?;
    match &findings {
        Value::Object(map) if !map.is_empty() => {}
        _ => return Err("'findings' must be a non-empty JSON object".to_string()),
    }

    Ok((confidence, status, findings))
}

/// `(input_cost, output_cost)` for a response, split by the model's
/// per-token pricing rather than attributed wholesale to input. Used only
/// by trace emission, which reports the two legs separately; `extract_cost`
/// still carries the combined `estimated_cost`.
fn extract_cost_breakdown(config: &OrchestratorConfig, response: &crate::transport::AgentResponse) -> (f64, f64) {
    match config.pricing_for(&response.model_id) {
        Some(pricing) => (
            pricing.cost(response.input_tokens, 0),
            pricing.cost(0, response.output_tokens),
        ),
        None => (0.0, 0.0),
    }
}

fn extract_cost(config: &OrchestratorConfig, response: &crate::transport::AgentResponse) -> AgentCost {
    let pricing = config.pricing_for(&response.model_id);
    match pricing {
        Some(pricing) => AgentCost {
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            estimated_cost: pricing.cost(response.input_tokens, response.output_tokens),
            model: response.model_id.clone(),
        },
        None => {
            warn!(model_id = %response.model_id, "no pricing configured for model; billing zero cost");
            AgentCost {
                input_tokens: response.input_tokens,
                output_tokens: response.output_tokens,
                estimated_cost: 0.0,
                model: response.model_id.clone(),
            }
        }
    }
}

fn classify_transport_error(error: TransportError) -> (ErrorCode, String) {
    match error {
        TransportError::Throttled => (ErrorCode::BedrockThrottling, error.to_string()),
        TransportError::DataSourceUnavailable(_) => (ErrorCode::DataSourceUnavailable, error.to_string()),
        TransportError::RateLimited => (ErrorCode::RateLimitExceeded, error.to_string()),
        TransportError::TimedOut => (ErrorCode::Timeout, error.to_string()),
        TransportError::AuthorizationDenied(_) => (ErrorCode::InternalError, error.to_string()),
        TransportError::Other(_) => (ErrorCode::UnknownError, error.to_string()),
    }
}

/// Decide between a retry signal and a terminal failure hypothesis:
/// retryable codes retry while attempts remain under the configured max.
fn classify_retry_or_fail(
    state: &GraphState,
    agent_id: &str,
    config: &OrchestratorConfig,
    code: ErrorCode,
    message: String,
) -> Attempt {
    if code.is_retryable() && state.retry_attempt(agent_id) < config.max_retries {
        Attempt::Retry
    } else {
        Attempt::Failure { code, message, cost: AgentCost::not_applicable() }
    }
}

fn terminal_failure(code: ErrorCode, message: String) -> Attempt {
    Attempt::Failure { code, message, cost: AgentCost::not_applicable() }
}

fn terminal_failure_with_cost(code: ErrorCode, message: String, cost: AgentCost) -> Attempt {
    Attempt::Failure { code, message, cost }
}
