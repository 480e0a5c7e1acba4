//! The guardrail-violation stream.
//!
//! One record per detected violation, `BLOCK` or `WARN`. Emission is
//! modeled as a single path whose downstream writes are idempotent, keyed
//! by `violation_id` — not two independent fires from the invoker and a
//! parallel guardrail handler.

use serde::{Deserialize, Serialize};

/// Whether a guardrail blocked the response or only warned about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuardrailAction {
    Block,
    Warn,
}

/// The `{type, action, category, threshold, confidence}` detail of one
/// violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationDetail {
    pub violation_type: String,
    pub action: GuardrailAction,
    pub category: String,
    pub threshold: f64,
    /// Defaults to `1.0` when the transport omits it — "maximum
    /// certainty" is the safe assumption when a guardrail doesn't report
    /// its own confidence.
    pub confidence: f64,
}

impl ViolationDetail {
    /// Used whenever the transport's guardrail signal omits a confidence.
    pub const DEFAULT_CONFIDENCE: f64 = 1.0;
}

/// Whether a follow-up retry is permitted after this violation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViolationResponse {
    pub blocked: bool,
    pub retry_allowed: bool,
}

/// One persisted guardrail-violation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailViolation {
    /// Partition key. Downstream writes keyed by this id are idempotent —
    /// the single-emission-path resolution to Open Question 1.
    pub violation_id: String,
    /// Sort key.
    pub timestamp: String,
    pub trace_id: String,
    pub agent_id: String,
    pub incident_id: String,
    pub execution_id: String,
    pub detail: ViolationDetail,
    /// Redacted before storage.
    pub redacted_input: String,
    /// Redacted before storage.
    pub redacted_output: String,
    pub response: ViolationResponse,
    pub metadata: Option<serde_json::Value>,
}

impl GuardrailViolation {
    /// Build a violation record, redacting `input`/`output` on the way in.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        violation_id: impl Into<String>,
        timestamp: impl Into<String>,
        trace_id: impl Into<String>,
        agent_id: impl Into<String>,
        incident_id: impl Into<String>,
        execution_id: impl Into<String>,
        detail: ViolationDetail,
        input: &str,
        output: &str,
        response: ViolationResponse,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            violation_id: violation_id.into(),
            timestamp: timestamp.into(),
            trace_id: trace_id.into(),
            agent_id: agent_id.into(),
            incident_id: incident_id.into(),
            execution_id: execution_id.into(),
            detail,
            redacted_input: crate::redact::redact(input),
            redacted_output: crate::redact::redact(output),
            response,
            metadata,
        }
    }
}

/// A sink for [`GuardrailViolation`]s. Best-effort, same contract as
/// [`crate::trace::TraceSink`].
#[async_trait::async_trait]
pub trait ViolationSink: Send + Sync {
    /// Persist one violation record. Idempotent on `violation_id`.
    async fn record(&self, violation: GuardrailViolation) -> crate::error::Result<()>;
}

/// In-memory violation sink, deduplicating by `violation_id` the way a
/// real store's upsert would.
#[derive(Debug, Default)]
pub struct InMemoryViolationSink {
    violations: tokio::sync::Mutex<std::collections::BTreeMap<String, GuardrailViolation>>,
}

impl InMemoryViolationSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every distinct violation recorded so far.
    pub async fn violations(&self) -> Vec<GuardrailViolation> {
        self.violations.lock().await.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl ViolationSink for InMemoryViolationSink {
    async fn record(&self, violation: GuardrailViolation) -> crate::error::Result<()> {
        self.violations
            .lock()
            .await
            .insert(violation.violation_id.clone(), violation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail() -> ViolationDetail {
        ViolationDetail {
            violation_type: "PII_DETECTED".into(),
            action: GuardrailAction::Block,
            category: "privacy".into(),
            threshold: 0.8,
            confidence: ViolationDetail::DEFAULT_CONFIDENCE,
        }
    }

    #[test]
    fn redacts_pii_from_input_and_output() {
        let violation = GuardrailViolation::build(
            "v1",
            "2026-07-27T00:00:00Z",
            "trace-1",
            "signal-intelligence",
            "INC-1",
            "exec-1",
            detail(),
            "email jane@example.com",
            "blocked",
            ViolationResponse { blocked: true, retry_allowed: false },
            None,
        );
        assert!(!violation.redacted_input.contains("jane@example.com"));
    }

    #[test]
    fn default_confidence_is_one() {
        assert_eq!(ViolationDetail::DEFAULT_CONFIDENCE, 1.0);
    }

    #[tokio::test]
    async fn sink_dedupes_by_violation_id() {
        let sink = InMemoryViolationSink::new();
        for _ in 0..2 {
            sink.record(GuardrailViolation::build(
                "v1",
                "2026-07-27T00:00:00Z",
                "trace-1",
                "signal-intelligence",
                "INC-1",
                "exec-1",
                detail(),
                "in",
                "out",
                ViolationResponse { blocked: true, retry_allowed: false },
                None,
            ))
            .await
            .unwrap();
        }
        assert_eq!(sink.violations().await.len(), 1);
    }
}
