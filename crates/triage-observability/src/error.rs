//! Error type for observability operations.
//!
//! Nothing in this crate's public surface is allowed to abort the
//! orchestrator: every operation that can fail returns this `Result` to
//! its *own* caller (so it's testable), but `triage-core` only ever calls
//! through [`crate::swallow`], which logs and discards it.

use thiserror::Error;

/// Failures internal to trace/violation/metric emission.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// A trace or violation record failed to serialize.
    #[error("failed to serialize observability record: {0}")]
    Serialization(String),

    /// The configured sink rejected a write.
    #[error("observability sink rejected a write: {0}")]
    SinkRejected(String),

    /// A metric operation failed (e.g. a malformed label set).
    #[error("metrics operation failed: {0}")]
    Metrics(String),
}

/// Result type for observability operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_display_their_detail() {
        assert!(Error::Serialization("x".into()).to_string().contains('x'));
        assert!(Error::SinkRejected("y".into()).to_string().contains('y'));
        assert!(Error::Metrics("z".into()).to_string().contains('z'));
    }
}
