//! File-backed checkpoint store: one JSON file per checkpoint under
//! `<base_dir>/<session_id>/<checkpoint_id>.json`, which survives process
//! restarts and is trivial to inspect with `triage-cli checkpoints show`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use triage_types::GraphState;

use crate::error::{Error, Result};
use crate::model::{Checkpoint, CheckpointMetadata};
use crate::Checkpointer;

/// `Checkpointer` backed by one JSON file per `(session_id, checkpoint_id)`.
#[derive(Debug, Clone)]
pub struct FileCheckpointer {
    base_dir: PathBuf,
}

impl FileCheckpointer {
    /// Store checkpoints under `base_dir`, creating it (and per-session
    /// subdirectories) lazily on first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(sanitize(session_id))
    }

    fn checkpoint_path(&self, session_id: &str, checkpoint_id: &str) -> PathBuf {
        self.session_dir(session_id)
            .join(format!("{}.json", sanitize(checkpoint_id)))
    }

    async fn read_checkpoint(path: &Path) -> Result<Checkpoint> {
        let bytes = fs::read(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::DeserializationFailed {
            reason: e.to_string(),
        })
    }
}

/// Directory and file names derived from `session_id`/`checkpoint_id` are
/// restricted to filesystem-safe characters; everything else becomes `_`.
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn put(
        &self,
        session_id: &str,
        checkpoint_id: &str,
        node_name: &str,
        state: &GraphState,
        created_at: &str,
    ) -> Result<()> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).await?;

        let checkpoint = Checkpoint {
            checkpoint_id: checkpoint_id.to_string(),
            session_id: session_id.to_string(),
            node_name: node_name.to_string(),
            state: state.clone(),
            created_at: created_at.to_string(),
        };
        let bytes = serde_json::to_vec_pretty(&checkpoint).map_err(|e| Error::SerializationFailed {
            reason: e.to_string(),
        })?;

        let path = self.checkpoint_path(session_id, checkpoint_id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes).await?;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        let metadata = self.list(session_id, 1).await?;
        match metadata.first() {
            Some(m) => {
                let path = self.checkpoint_path(session_id, &m.checkpoint_id);
                Ok(Some(Self::read_checkpoint(&path).await?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, session_id: &str, limit: usize) -> Result<Vec<CheckpointMetadata>> {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut checkpoint_ids = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    checkpoint_ids.push(stem.to_string());
                }
            }
        }
        checkpoint_ids.sort_unstable_by(|a, b| b.cmp(a));
        checkpoint_ids.truncate(limit);

        let mut metadata = Vec::with_capacity(checkpoint_ids.len());
        for checkpoint_id in checkpoint_ids {
            let path = self.checkpoint_path(session_id, &checkpoint_id);
            metadata.push(Self::read_checkpoint(&path).await?.metadata());
        }
        Ok(metadata)
    }
}
