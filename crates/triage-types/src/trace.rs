//! Append-only execution trace entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status recorded by a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TraceStatus {
    /// A node began executing.
    Started,
    /// A node finished successfully.
    Completed,
    /// A node's invocation failed terminally.
    Failed,
    /// A node signalled a retry.
    Retrying,
}

/// One entry in a run's append-only `execution_trace`.
///
/// The sequence of `node_id` values across a replay must be identical to
/// the original run; durations and wall-clock timestamps are explicitly
/// excepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTraceEntry {
    /// Which node produced this entry (e.g. an agent id, `"consensus"`,
    /// `"cost-guardian"`, `"__entry__"`).
    pub node_id: String,
    /// ISO-8601 timestamp of the entry.
    pub timestamp: String,
    /// Duration of the node's work, when known.
    pub duration_ms: Option<u64>,
    /// Lifecycle status this entry records.
    pub status: TraceStatus,
    /// Optional structured metadata (e.g. confidence, retry attempt).
    pub metadata: Option<Value>,
}

impl ExecutionTraceEntry {
    /// Construct a trace entry with no duration and no metadata.
    pub fn new(
        node_id: impl Into<String>,
        timestamp: impl Into<String>,
        status: TraceStatus,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            timestamp: timestamp.into(),
            duration_ms: None,
            status,
            metadata: None,
        }
    }

    /// Attach a duration.
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
