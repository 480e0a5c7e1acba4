//! The LLM-trace stream.
//!
//! One event per agent invocation, carrying request/response text, token
//! counts, cost, latency, guardrails applied, and validation status.
//! Redaction runs *after* the caller has already extracted cost — this
//! module only ever receives already-final token counts and applies
//! redaction to the free-text fields before a sink persists the record.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::redact::{redact, sanitize_variable, MAX_VARIABLE_BYTES};

/// One persisted record of an agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmTraceEvent {
    /// Partition key.
    pub trace_id: String,
    /// Sort key.
    pub timestamp: String,
    /// ISO-8601 instant this record should be purged (90 days hence).
    pub ttl: String,
    /// Schema version of this record shape.
    pub schema_version: u32,
    pub incident_id: String,
    pub execution_id: String,
    pub agent_id: String,
    pub model_id: String,
    pub model_version: String,
    /// Redacted, truncated prompt text.
    pub prompt: String,
    pub prompt_tokens: u64,
    /// Redacted, truncated response text.
    pub response: String,
    pub response_tokens: u64,
    pub finish_reason: String,
    pub latency_ms: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub retry_count: u32,
    pub guardrails_applied: Vec<String>,
    pub validation_status: String,
}

/// Raw, unredacted fields used to build an [`LlmTraceEvent`]. Kept
/// separate from the event itself so the redaction boundary is
/// structurally explicit: nothing can construct an `LlmTraceEvent`
/// without going through [`LlmTraceEvent::build`].
pub struct RawTrace<'a> {
    pub trace_id: String,
    pub incident_id: &'a str,
    pub execution_id: &'a str,
    pub agent_id: &'a str,
    pub model_id: &'a str,
    pub model_version: &'a str,
    pub prompt: &'a serde_json::Value,
    pub prompt_tokens: u64,
    pub response: &'a serde_json::Value,
    pub response_tokens: u64,
    pub finish_reason: &'a str,
    pub latency_ms: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub retry_count: u32,
    pub guardrails_applied: Vec<String>,
    pub validation_status: &'a str,
    pub timestamp: String,
    pub trace_ttl_days: u32,
}

impl LlmTraceEvent {
    /// Build a trace event, redacting `prompt`/`response` on the way in.
    pub fn build(raw: RawTrace<'_>) -> Self {
        let ttl = (Utc::now_or(&raw.timestamp) + Duration::days(i64::from(raw.trace_ttl_days)))
            .to_rfc3339();
        Self {
            trace_id: raw.trace_id,
            timestamp: raw.timestamp,
            ttl,
            schema_version: triage_types::SCHEMA_VERSION,
            incident_id: raw.incident_id.to_string(),
            execution_id: raw.execution_id.to_string(),
            agent_id: raw.agent_id.to_string(),
            model_id: raw.model_id.to_string(),
            model_version: raw.model_version.to_string(),
            prompt: sanitize_variable(raw.prompt, MAX_VARIABLE_BYTES),
            prompt_tokens: raw.prompt_tokens,
            response: sanitize_variable(raw.response, MAX_VARIABLE_BYTES),
            response_tokens: raw.response_tokens,
            finish_reason: redact(raw.finish_reason),
            latency_ms: raw.latency_ms,
            input_cost: raw.input_cost,
            output_cost: raw.output_cost,
            total_cost: raw.total_cost,
            retry_count: raw.retry_count,
            guardrails_applied: raw.guardrails_applied,
            validation_status: raw.validation_status.to_string(),
        }
    }
}

/// Extension so trace timestamps can be parsed deterministically instead
/// of always taking the wall clock, which would break byte-for-byte
/// identical output on replay for anything that reads `ttl` back out.
trait UtcNowOr {
    fn now_or(timestamp: &str) -> chrono::DateTime<Utc>;
}

impl UtcNowOr for Utc {
    fn now_or(timestamp: &str) -> chrono::DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339(timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

/// A sink for [`LlmTraceEvent`]s. Every implementation must be
/// best-effort — callers route failures through [`crate::swallow`],
/// never propagate them into the orchestration path.
#[async_trait::async_trait]
pub trait TraceSink: Send + Sync {
    /// Persist one trace event.
    async fn record(&self, event: LlmTraceEvent) -> crate::error::Result<()>;
}

/// In-memory trace sink: collects events for inspection (tests, `triage-cli
/// run --inspect-traces`). At-least-once delivery is trivially satisfied
/// by an append-only `Vec`.
#[derive(Debug, Default)]
pub struct InMemoryTraceSink {
    events: tokio::sync::Mutex<Vec<LlmTraceEvent>>,
}

impl InMemoryTraceSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far.
    pub async fn events(&self) -> Vec<LlmTraceEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl TraceSink for InMemoryTraceSink {
    async fn record(&self, event: LlmTraceEvent) -> crate::error::Result<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw<'a>(prompt: &'a serde_json::Value, response: &'a serde_json::Value) -> RawTrace<'a> {
        RawTrace {
            trace_id: "trace-1".into(),
            incident_id: "INC-1",
            execution_id: "exec-1",
            agent_id: "signal-intelligence",
            model_id: "claude-3",
            model_version: "1",
            prompt,
            prompt_tokens: 100,
            response,
            response_tokens: 50,
            finish_reason: "stop",
            latency_ms: 250,
            input_cost: 0.001,
            output_cost: 0.0005,
            total_cost: 0.0015,
            retry_count: 0,
            guardrails_applied: vec![],
            validation_status: "SCHEMA_VALID",
            timestamp: "2026-07-27T00:00:00Z".into(),
            trace_ttl_days: 90,
        }
    }

    #[test]
    fn redacts_pii_from_prompt_and_response() {
        let prompt = json!("contact jane@example.com about this");
        let response = json!("will do");
        let event = LlmTraceEvent::build(raw(&prompt, &response));
        assert!(!event.prompt.contains("jane@example.com"));
        assert!(event.prompt.contains("[EMAIL_REDACTED]"));
    }

    #[test]
    fn preserves_raw_token_counts_despite_redaction() {
        let prompt = json!("email jane@example.com");
        let response = json!("ok");
        let event = LlmTraceEvent::build(raw(&prompt, &response));
        assert_eq!(event.prompt_tokens, 100);
        assert_eq!(event.response_tokens, 50);
        assert_eq!(event.total_cost, 0.0015);
    }

    #[test]
    fn ttl_is_derived_from_the_supplied_timestamp_not_wall_clock() {
        let prompt = json!("x");
        let response = json!("y");
        let event = LlmTraceEvent::build(raw(&prompt, &response));
        assert!(event.ttl.starts_with("2026-10-25"));
    }

    #[tokio::test]
    async fn in_memory_sink_accumulates_events() {
        let sink = InMemoryTraceSink::new();
        let prompt = json!("x");
        let response = json!("y");
        sink.record(LlmTraceEvent::build(raw(&prompt, &response)))
            .await
            .unwrap();
        assert_eq!(sink.events().await.len(), 1);
    }
}
