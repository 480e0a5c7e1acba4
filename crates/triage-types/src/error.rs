//! Construction-time errors for the state model.
//!
//! These are distinct from [`crate::structured_error::StructuredError`],
//! which represents an *agent invocation* failure that becomes part of a
//! run's state. `TypeError` is raised only when a caller tries to build a
//! value that violates an invariant outright (e.g. a confidence outside
//! `[0.0, 1.0]`), which in practice means a programming bug upstream.

use thiserror::Error;

/// Errors raised while constructing or validating value objects.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum TypeError {
    /// A field required to be non-empty was empty.
    #[error("field '{field}' must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A confidence or probability value fell outside `[0.0, 1.0]`.
    #[error("'{field}' must be in [0.0, 1.0], got {value}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The value that was rejected.
        value: f64,
    },

    /// `evidence_bundle` (or another JSON field) was not a JSON object.
    #[error("'{field}' must be a non-empty JSON object")]
    NotAnObject {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A disclaimer was missing the required literal token.
    #[error("disclaimer must contain the literal token '{token}'")]
    MissingDisclaimerToken {
        /// The token that was required.
        token: &'static str,
    },
}

/// Result type for value-object construction.
pub type TypeResult<T> = std::result::Result<T, TypeError>;
