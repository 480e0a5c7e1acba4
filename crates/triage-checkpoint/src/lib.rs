//! The checkpoint store: a per-session append-only log of [`GraphState`]
//! snapshots that lets the graph driver crash-resume from the exact node
//! it last completed.
//!
//! This crate exposes a single canonical interface — `put` / `latest` /
//! `list` — rather than the thinner `put`/`get` shape some stores expose
//! alongside a richer one; the richer shape is sufficient and avoids
//! carrying two divergent checkpointer APIs.

pub mod error;
pub mod file;
pub mod memory;
pub mod model;

pub use error::{Error, Result};
pub use file::FileCheckpointer;
pub use memory::MemoryCheckpointer;
pub use model::{format_checkpoint_id, Checkpoint, CheckpointMetadata};

use async_trait::async_trait;
use triage_types::GraphState;

/// A per-session append-only checkpoint log.
///
/// `session_id` partitions; `checkpoint_id` sorts within a partition
/// (latest wins). Implementations must never inspect `state` beyond
/// (de)serializing it.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Write a checkpoint. Idempotent on `(session_id, checkpoint_id)` —
    /// calling this twice with the same id and the same state is a no-op,
    /// not an error.
    async fn put(
        &self,
        session_id: &str,
        checkpoint_id: &str,
        node_name: &str,
        state: &GraphState,
        created_at: &str,
    ) -> Result<()>;

    /// The most recent checkpoint for `session_id`, if any.
    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint>>;

    /// Checkpoints for `session_id`, descending by `checkpoint_id`, capped
    /// at `limit`.
    async fn list(&self, session_id: &str, limit: usize) -> Result<Vec<CheckpointMetadata>>;
}
