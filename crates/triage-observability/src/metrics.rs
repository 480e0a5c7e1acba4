//! Cardinality-disciplined metrics.
//!
//! Dimensions are restricted to a low-cardinality set: `agent_id`,
//! `violation_type`, `action`, `query_type`. High-cardinality identifiers
//! (`incident_id`, `execution_id`, `trace_id`) are never accepted as label
//! values here — they belong in the stored trace and violation records,
//! not in metric series.

use prometheus::{Histogram, HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry};

/// The namespaces metrics are grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Orchestration,
    Cost,
    Guardrails,
    Knowledge,
}

impl Namespace {
    fn as_str(self) -> &'static str {
        match self {
            Namespace::Orchestration => "orchestration",
            Namespace::Cost => "cost",
            Namespace::Guardrails => "guardrails",
            Namespace::Knowledge => "knowledge",
        }
    }
}

/// A `prometheus::Registry` pre-wired with the counters/gauges/histograms
/// this crate needs, each labeled only on cardinality-safe dimensions.
pub struct MetricsRegistry {
    registry: Registry,
    pub invocations_total: IntCounterVec,
    pub failures_total: IntCounterVec,
    pub retries_total: IntCounterVec,
    pub guardrail_violations_total: IntCounterVec,
    pub zero_result_queries_total: IntCounterVec,
    pub latency_ms: Histogram,
    pub cost_usd: Histogram,
    pub confidence: Histogram,
    pub budget_remaining: IntGaugeVec,
}

impl MetricsRegistry {
    /// Build a fresh registry and register every metric this crate exposes.
    ///
    /// # Panics
    ///
    /// Panics only if `prometheus` itself rejects a metric definition
    /// (e.g. a name collision within this registry), which would be a
    /// programming bug in this constructor, not a runtime condition.
    pub fn new() -> Self {
        let registry = Registry::new();

        let invocations_total = IntCounterVec::new(
            Opts::new(
                "invocations_total",
                "Agent invocations attempted, by agent_id",
            )
            .namespace(Namespace::Orchestration.as_str()),
            &["agent_id"],
        )
        .expect("metric definition is valid");

        let failures_total = IntCounterVec::new(
            Opts::new("failures_total", "Agent invocations that ended in FAILURE, by agent_id")
                .namespace(Namespace::Orchestration.as_str()),
            &["agent_id"],
        )
        .expect("metric definition is valid");

        let retries_total = IntCounterVec::new(
            Opts::new("retries_total", "Retry attempts issued, by agent_id")
                .namespace(Namespace::Orchestration.as_str()),
            &["agent_id"],
        )
        .expect("metric definition is valid");

        let guardrail_violations_total = IntCounterVec::new(
            Opts::new(
                "violations_total",
                "Guardrail violations, by agent_id/violation_type/action",
            )
            .namespace(Namespace::Guardrails.as_str()),
            &["agent_id", "violation_type", "action"],
        )
        .expect("metric definition is valid");

        let zero_result_queries_total = IntCounterVec::new(
            Opts::new(
                "zero_result_queries_total",
                "Knowledge-retrieval queries returning no results, by query_type",
            )
            .namespace(Namespace::Knowledge.as_str()),
            &["query_type"],
        )
        .expect("metric definition is valid");

        let latency_ms = Histogram::with_opts(
            HistogramOpts::new("latency_ms", "Per-invocation latency in milliseconds")
                .namespace(Namespace::Orchestration.as_str()),
        )
        .expect("metric definition is valid");

        let cost_usd = Histogram::with_opts(
            HistogramOpts::new("usd", "Per-invocation estimated cost in USD")
                .namespace(Namespace::Cost.as_str()),
        )
        .expect("metric definition is valid");

        let confidence = Histogram::with_opts(
            HistogramOpts::new("confidence", "Self-reported agent confidence")
                .namespace(Namespace::Orchestration.as_str()),
        )
        .expect("metric definition is valid");

        let budget_remaining = IntGaugeVec::new(
            Opts::new(
                "budget_remaining_microdollars",
                "Remaining budget in USD, scaled by 1e6 for integer precision, by agent_id",
            )
            .namespace(Namespace::Cost.as_str()),
            &["agent_id"],
        )
        .expect("metric definition is valid");

        for collector in [
            Box::new(invocations_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(failures_total.clone()),
            Box::new(retries_total.clone()),
            Box::new(guardrail_violations_total.clone()),
            Box::new(zero_result_queries_total.clone()),
            Box::new(latency_ms.clone()),
            Box::new(cost_usd.clone()),
            Box::new(confidence.clone()),
            Box::new(budget_remaining.clone()),
        ] {
            registry.register(collector).expect("metric registration does not collide");
        }

        Self {
            registry,
            invocations_total,
            failures_total,
            retries_total,
            guardrail_violations_total,
            zero_result_queries_total,
            latency_ms,
            cost_usd,
            confidence,
            budget_remaining,
        }
    }

    /// The underlying `prometheus::Registry`, for exposition (e.g. a
    /// `/metrics` HTTP endpoint wired up by the embedding application).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_agent_scoped_counters_without_high_cardinality_labels() {
        let metrics = MetricsRegistry::new();
        metrics.invocations_total.with_label_values(&["signal-intelligence"]).inc();
        metrics.retries_total.with_label_values(&["signal-intelligence"]).inc();
        assert_eq!(
            metrics.invocations_total.with_label_values(&["signal-intelligence"]).get(),
            1
        );
    }

    #[test]
    fn guardrail_violations_are_labeled_only_on_the_cardinality_safe_triple() {
        let metrics = MetricsRegistry::new();
        metrics
            .guardrail_violations_total
            .with_label_values(&["signal-intelligence", "PII_DETECTED", "BLOCK"])
            .inc();
        assert_eq!(
            metrics
                .guardrail_violations_total
                .with_label_values(&["signal-intelligence", "PII_DETECTED", "BLOCK"])
                .get(),
            1
        );
    }

    #[test]
    fn metric_families_are_exposed_through_the_registry() {
        let metrics = MetricsRegistry::new();
        metrics.invocations_total.with_label_values(&["signal-intelligence"]).inc();
        let families = metrics.registry().gather();
        assert!(families.iter().any(|f| f.name() == "orchestration_invocations_total"));
    }
}
