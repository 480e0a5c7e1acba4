//! The checkpoint envelope.

use serde::{Deserialize, Serialize};
use triage_types::GraphState;

/// A persisted snapshot of [`GraphState`] after one completed node.
///
/// `session_id` is the partition key, `checkpoint_id` the sort key,
/// `node_name`/`created_at` the attributes alongside the state blob. The
/// store never inspects `state` beyond (de)serializing it — the blob is
/// an opaque serialization of `GraphState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Sort key within `session_id`. Lexicographically sortable — this
    /// crate formats it as a zero-padded decimal sequence number, an
    /// equally valid sortable-string scheme to ISO-8601.
    pub checkpoint_id: String,
    /// Partition key.
    pub session_id: String,
    /// Name of the node that had just completed when this checkpoint was
    /// written (an agent id, `"consensus"`, `"cost-guardian"`, or
    /// `"__entry__"`).
    pub node_name: String,
    /// The full state snapshot.
    pub state: GraphState,
    /// ISO-8601 timestamp of when this checkpoint was written.
    pub created_at: String,
}

/// Metadata about a checkpoint, without the (potentially large) state
/// blob — returned by [`crate::Checkpointer::list`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Sort key within `session_id`.
    pub checkpoint_id: String,
    /// Partition key.
    pub session_id: String,
    /// Name of the node that had just completed.
    pub node_name: String,
    /// ISO-8601 timestamp of when this checkpoint was written.
    pub created_at: String,
}

impl Checkpoint {
    /// The metadata view of this checkpoint (drops the state blob).
    pub fn metadata(&self) -> CheckpointMetadata {
        CheckpointMetadata {
            checkpoint_id: self.checkpoint_id.clone(),
            session_id: self.session_id.clone(),
            node_name: self.node_name.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

/// Format a zero-padded, lexicographically sortable checkpoint id from a
/// monotonically increasing sequence number.
///
/// Twenty digits comfortably outlives any run this orchestrator will ever
/// execute (the fixed topology has ten nodes; no run will approach `1e20`
/// checkpoints), while keeping string comparison equivalent to numeric
/// comparison.
pub fn format_checkpoint_id(sequence: u64) -> String {
    format!("{sequence:020}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_ids_sort_lexicographically_in_numeric_order() {
        let ids: Vec<String> = (0..12).map(format_checkpoint_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
