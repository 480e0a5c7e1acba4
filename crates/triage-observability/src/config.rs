//! Configuration for the observability plane.
//!
//! Covers what this crate actually emits: structured console logs
//! (`tracing`), a persisted LLM-trace/violation stream, and a
//! cardinality-disciplined metrics registry. See `DESIGN.md` for why the
//! OpenTelemetry exporter machinery was dropped rather than carried
//! forward unused.

use serde::{Deserialize, Serialize};

/// How verbose the `tracing` subscriber should be absent an explicit
/// `RUST_LOG`/`TRIAGE_LOG` override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The `tracing`/`EnvFilter` directive string for this level.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Observability plane configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Service name attached to every log line and trace record.
    pub service_name: String,
    /// Default log verbosity; overridden by `RUST_LOG` if set.
    pub log_level: LogLevel,
    /// TTL, in days, for persisted LLM-trace records (90 by default).
    pub trace_ttl_days: u32,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "triage-orchestrator".to_string(),
            log_level: LogLevel::Info,
            trace_ttl_days: 90,
        }
    }
}
