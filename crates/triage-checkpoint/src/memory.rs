//! In-memory checkpoint store: useful for tests and short-lived runs,
//! does not persist across process restarts.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use triage_types::GraphState;

use crate::error::Result;
use crate::model::{Checkpoint, CheckpointMetadata};
use crate::Checkpointer;

/// `Checkpointer` backed by a process-local `BTreeMap`.
///
/// Keyed by `session_id`, each partition is itself a `BTreeMap` ordered by
/// `checkpoint_id` so "latest" and "list descending" are O(log n) and
/// O(k), respectively, with no extra bookkeeping.
#[derive(Debug, Default)]
pub struct MemoryCheckpointer {
    sessions: RwLock<BTreeMap<String, BTreeMap<String, Checkpoint>>>,
}

impl MemoryCheckpointer {
    /// Construct an empty in-memory checkpoint store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn put(
        &self,
        session_id: &str,
        checkpoint_id: &str,
        node_name: &str,
        state: &GraphState,
        created_at: &str,
    ) -> Result<()> {
        let checkpoint = Checkpoint {
            checkpoint_id: checkpoint_id.to_string(),
            session_id: session_id.to_string(),
            node_name: node_name.to_string(),
            state: state.clone(),
            created_at: created_at.to_string(),
        };
        let mut sessions = self.sessions.write().expect("checkpoint store lock poisoned");
        sessions
            .entry(session_id.to_string())
            .or_default()
            .insert(checkpoint_id.to_string(), checkpoint);
        Ok(())
    }

    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let sessions = self.sessions.read().expect("checkpoint store lock poisoned");
        Ok(sessions
            .get(session_id)
            .and_then(|partition| partition.values().next_back())
            .cloned())
    }

    async fn list(&self, session_id: &str, limit: usize) -> Result<Vec<CheckpointMetadata>> {
        let sessions = self.sessions.read().expect("checkpoint store lock poisoned");
        let metadata = sessions
            .get(session_id)
            .map(|partition| {
                partition
                    .values()
                    .rev()
                    .take(limit)
                    .map(Checkpoint::metadata)
                    .collect()
            })
            .unwrap_or_default();
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::format_checkpoint_id;
    use serde_json::json;
    use triage_types::AgentInput;

    fn state() -> GraphState {
        let input = AgentInput::new(
            "INC-1",
            json!({"signals": []}),
            "2026-07-27T00:00:00Z",
            "exec-1",
            "session-1",
            None,
            None,
        )
        .unwrap();
        GraphState::new(input, 5.0, "2026-07-27T00:00:00Z")
    }

    #[tokio::test]
    async fn latest_returns_none_for_unknown_session() {
        let store = MemoryCheckpointer::new();
        assert!(store.latest("session-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn latest_wins_by_checkpoint_id_not_insertion_order() {
        let store = MemoryCheckpointer::new();
        store
            .put(
                "session-1",
                &format_checkpoint_id(0),
                "__entry__",
                &state(),
                "2026-07-27T00:00:00Z",
            )
            .await
            .unwrap();
        store
            .put(
                "session-1",
                &format_checkpoint_id(1),
                "signal-intelligence",
                &state(),
                "2026-07-27T00:00:01Z",
            )
            .await
            .unwrap();

        let latest = store.latest("session-1").await.unwrap().unwrap();
        assert_eq!(latest.node_name, "signal-intelligence");
        assert_eq!(latest.checkpoint_id, format_checkpoint_id(1));
    }

    #[tokio::test]
    async fn list_is_descending_and_respects_limit() {
        let store = MemoryCheckpointer::new();
        for i in 0..5 {
            store
                .put(
                    "session-1",
                    &format_checkpoint_id(i),
                    "node",
                    &state(),
                    "2026-07-27T00:00:00Z",
                )
                .await
                .unwrap();
        }
        let list = store.list("session-1", 3).await.unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].checkpoint_id, format_checkpoint_id(4));
        assert_eq!(list[2].checkpoint_id, format_checkpoint_id(2));
    }

    #[tokio::test]
    async fn put_is_idempotent_on_session_and_checkpoint_id() {
        let store = MemoryCheckpointer::new();
        store
            .put("session-1", &format_checkpoint_id(0), "__entry__", &state(), "t0")
            .await
            .unwrap();
        store
            .put("session-1", &format_checkpoint_id(0), "__entry__", &state(), "t0")
            .await
            .unwrap();
        assert_eq!(store.list("session-1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sessions_do_not_see_each_others_checkpoints() {
        let store = MemoryCheckpointer::new();
        store
            .put("session-1", &format_checkpoint_id(0), "node", &state(), "t0")
            .await
            .unwrap();
        assert!(store.latest("session-2").await.unwrap().is_none());
    }
}
