//! The out-of-band observability plane.
//!
//! Two independent streams — LLM traces and guardrail violations — plus a
//! cardinality-disciplined metrics registry. Every public entry point is
//! best-effort: [`swallow`] is the one place that turns a `Result` into
//! nothing, and `triage-core` is expected to call everything in this crate
//! through it, never propagating a failure here into the main path.

pub mod config;
pub mod error;
pub mod exporter;
pub mod guardrail;
pub mod metrics;
pub mod redact;
pub mod trace;

pub use config::{LogLevel, ObservabilityConfig};
pub use error::{Error, Result};
pub use exporter::init_logging;
pub use guardrail::{
    GuardrailAction, GuardrailViolation, InMemoryViolationSink, ViolationDetail,
    ViolationResponse, ViolationSink,
};
pub use metrics::{MetricsRegistry, Namespace};
pub use redact::{redact, sanitize_variable};
pub use trace::{InMemoryTraceSink, LlmTraceEvent, RawTrace, TraceSink};

use std::future::Future;

/// Run a fallible observability operation, logging and discarding any
/// error instead of letting it propagate. Every observability operation
/// is wrapped so that an exception is logged and swallowed, never
/// propagated into the orchestration path.
pub async fn swallow<F>(operation: &str, future: F)
where
    F: Future<Output = Result<()>>,
{
    if let Err(error) = future.await {
        tracing::warn!(operation, %error, "observability operation failed; continuing");
    }
}

/// Bundles the two sinks and the metrics registry an orchestrator run
/// needs, so `triage-core` can hold one handle instead of three.
pub struct ObservabilityPlane {
    pub traces: std::sync::Arc<dyn TraceSink>,
    pub violations: std::sync::Arc<dyn ViolationSink>,
    pub metrics: std::sync::Arc<MetricsRegistry>,
}

impl ObservabilityPlane {
    /// An in-memory plane suitable for tests and local `triage-cli` runs.
    pub fn in_memory() -> Self {
        Self {
            traces: std::sync::Arc::new(InMemoryTraceSink::new()),
            violations: std::sync::Arc::new(InMemoryViolationSink::new()),
            metrics: std::sync::Arc::new(MetricsRegistry::new()),
        }
    }

    /// Emit a trace event, swallowing any failure.
    pub async fn emit_trace(&self, event: LlmTraceEvent) {
        let sink = self.traces.clone();
        swallow("emit_trace", async move { sink.record(event).await }).await;
    }

    /// Emit a violation record, swallowing any failure.
    pub async fn emit_violation(&self, violation: GuardrailViolation) {
        let sink = self.violations.clone();
        swallow("emit_violation", async move { sink.record(violation).await }).await;
    }

    /// Record one agent invocation attempt, labeled by `agent_id` only.
    pub async fn record_invocation(&self, agent_id: &str) {
        let metrics = self.metrics.clone();
        let agent_id = agent_id.to_string();
        swallow("record_invocation", async move {
            metrics.invocations_total.with_label_values(&[&agent_id]).inc();
            Ok(())
        })
        .await;
    }

    /// Record one terminal (non-retryable) agent failure.
    pub async fn record_failure(&self, agent_id: &str) {
        let metrics = self.metrics.clone();
        let agent_id = agent_id.to_string();
        swallow("record_failure", async move {
            metrics.failures_total.with_label_values(&[&agent_id]).inc();
            Ok(())
        })
        .await;
    }

    /// Record one retry signal.
    pub async fn record_retry(&self, agent_id: &str) {
        let metrics = self.metrics.clone();
        let agent_id = agent_id.to_string();
        swallow("record_retry", async move {
            metrics.retries_total.with_label_values(&[&agent_id]).inc();
            Ok(())
        })
        .await;
    }

    /// Record one guardrail violation, labeled on the cardinality-safe
    /// `agent_id`/`violation_type`/`action` triple.
    pub async fn record_guardrail_violation(&self, agent_id: &str, violation_type: &str, action: &str) {
        let metrics = self.metrics.clone();
        let agent_id = agent_id.to_string();
        let violation_type = violation_type.to_string();
        let action = action.to_string();
        swallow("record_guardrail_violation", async move {
            metrics
                .guardrail_violations_total
                .with_label_values(&[&agent_id, &violation_type, &action])
                .inc();
            Ok(())
        })
        .await;
    }

    /// Observe latency/cost/confidence for one successful invocation.
    /// These histograms are unlabeled — per-agent breakdown would push
    /// `agent_id` into a high-cardinality histogram series, which the
    /// cardinality rule (agent_id/violation_type/action/query_type only on
    /// counters and gauges) does not extend to.
    pub async fn observe_success(&self, latency_ms: u64, cost_usd: f64, confidence: f64) {
        let metrics = self.metrics.clone();
        swallow("observe_success", async move {
            metrics.latency_ms.observe(latency_ms as f64);
            metrics.cost_usd.observe(cost_usd);
            metrics.confidence.observe(confidence);
            Ok(())
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;

    #[async_trait::async_trait]
    impl TraceSink for AlwaysFails {
        async fn record(&self, _event: LlmTraceEvent) -> Result<()> {
            Err(Error::SinkRejected("simulated outage".into()))
        }
    }

    #[tokio::test]
    async fn swallow_discards_errors_without_panicking() {
        let sink = AlwaysFails;
        let event = LlmTraceEvent::build(trace::RawTrace {
            trace_id: "t1".into(),
            incident_id: "INC-1",
            execution_id: "exec-1",
            agent_id: "signal-intelligence",
            model_id: "m",
            model_version: "1",
            prompt: &serde_json::json!("p"),
            prompt_tokens: 1,
            response: &serde_json::json!("r"),
            response_tokens: 1,
            finish_reason: "stop",
            latency_ms: 1,
            input_cost: 0.0,
            output_cost: 0.0,
            total_cost: 0.0,
            retry_count: 0,
            guardrails_applied: vec![],
            validation_status: "OK",
            timestamp: "2026-07-27T00:00:00Z".into(),
            trace_ttl_days: 90,
        });
        swallow("test", async { sink.record(event).await }).await;
    }

    #[tokio::test]
    async fn in_memory_plane_accumulates_traces_and_violations() {
        let plane = ObservabilityPlane::in_memory();
        let event = LlmTraceEvent::build(trace::RawTrace {
            trace_id: "t1".into(),
            incident_id: "INC-1",
            execution_id: "exec-1",
            agent_id: "signal-intelligence",
            model_id: "m",
            model_version: "1",
            prompt: &serde_json::json!("p"),
            prompt_tokens: 1,
            response: &serde_json::json!("r"),
            response_tokens: 1,
            finish_reason: "stop",
            latency_ms: 1,
            input_cost: 0.0,
            output_cost: 0.0,
            total_cost: 0.0,
            retry_count: 0,
            guardrails_applied: vec![],
            validation_status: "OK",
            timestamp: "2026-07-27T00:00:00Z".into(),
            trace_ttl_days: 90,
        });
        plane.emit_trace(event).await;

        let violation = GuardrailViolation::build(
            "v1",
            "2026-07-27T00:00:00Z",
            "t1",
            "signal-intelligence",
            "INC-1",
            "exec-1",
            ViolationDetail {
                violation_type: "PII_DETECTED".into(),
                action: GuardrailAction::Warn,
                category: "privacy".into(),
                threshold: 0.5,
                confidence: ViolationDetail::DEFAULT_CONFIDENCE,
            },
            "in",
            "out",
            ViolationResponse { blocked: false, retry_allowed: true },
            None,
        );
        plane.emit_violation(violation).await;

        plane.metrics.invocations_total.with_label_values(&["signal-intelligence"]).inc();
        assert_eq!(
            plane.metrics.invocations_total.with_label_values(&["signal-intelligence"]).get(),
            1
        );
    }
}
