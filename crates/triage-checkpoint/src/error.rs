//! Errors raised by a [`crate::Checkpointer`] implementation.

use thiserror::Error;

/// Failures a checkpoint store can report.
///
/// The checkpoint store is the orchestrator's one mutable shared
/// resource, and a store failure is a hard error for the driver — unlike
/// the observability plane, checkpointing is not best-effort: a
/// crash-resume that can't find its last checkpoint is a correctness bug,
/// not a degraded run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The backing store could not be reached.
    #[error("checkpoint store unavailable: {reason}")]
    StoreUnavailable {
        /// Human-readable detail.
        reason: String,
    },

    /// A checkpoint blob failed to serialize.
    #[error("failed to serialize checkpoint state: {reason}")]
    SerializationFailed {
        /// Human-readable detail.
        reason: String,
    },

    /// A stored checkpoint blob failed to deserialize.
    #[error("failed to deserialize checkpoint state: {reason}")]
    DeserializationFailed {
        /// Human-readable detail.
        reason: String,
    },

    /// An I/O error occurred while reading or writing a checkpoint file.
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
