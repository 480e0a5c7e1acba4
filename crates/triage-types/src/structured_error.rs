//! The error taxonomy and the envelope that carries one error into a
//! run's `errors` list.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed taxonomy of agent-invocation failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Throttled by the LLM provider. Retryable.
    BedrockThrottling,
    /// A transient evidence/data source was unavailable. Retryable.
    DataSourceUnavailable,
    /// Explicit rate limit from the transport. Retryable.
    RateLimitExceeded,
    /// The per-call timeout elapsed. Retryable.
    Timeout,
    /// Input failed validation before the call was made. Terminal.
    InvalidInput,
    /// The assembled response failed schema validation. Terminal.
    SchemaValidationFailed,
    /// The response body was empty or not parseable JSON. Terminal.
    OutputValidationFailed,
    /// The response parsed, but confidence was too low to use. Terminal.
    LowConfidence,
    /// The remaining budget was already exhausted. Terminal.
    BudgetExceeded,
    /// A safety guardrail blocked the response. Terminal.
    GuardrailBlocked,
    /// Authorization was denied by the transport. Terminal.
    InternalError,
    /// Anything else. Terminal.
    UnknownError,
}

impl ErrorCode {
    /// Is this error code retryable?
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::BedrockThrottling
                | ErrorCode::DataSourceUnavailable
                | ErrorCode::RateLimitExceeded
                | ErrorCode::Timeout
        )
    }
}

/// A classified failure attached to a run's `errors` list.
///
/// Distinct from a Rust `std::error::Error`: this is itself a value object
/// that becomes part of the persisted, replayable state, not something
/// that propagates up a call stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredError {
    /// Which agent this error was raised for.
    pub agent_id: String,
    /// The classified error code.
    pub error_code: ErrorCode,
    /// Human-readable message (not part of the deterministic hash).
    pub message: String,
    /// Whether the invoker classified this as retryable.
    pub retryable: bool,
    /// ISO-8601 timestamp of when the error was recorded.
    pub timestamp: String,
    /// Which retry attempt this was (0 for the first attempt).
    pub retry_attempt: u32,
    /// Optional structured detail for debugging.
    pub details: Option<Value>,
}

impl StructuredError {
    /// Build a `StructuredError`, deriving `retryable` from `error_code`.
    pub fn new(
        agent_id: impl Into<String>,
        error_code: ErrorCode,
        message: impl Into<String>,
        timestamp: impl Into<String>,
        retry_attempt: u32,
        details: Option<Value>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            error_code,
            retryable: error_code.is_retryable(),
            message: message.into(),
            timestamp: timestamp.into(),
            retry_attempt,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes_match_taxonomy() {
        for code in [
            ErrorCode::BedrockThrottling,
            ErrorCode::DataSourceUnavailable,
            ErrorCode::RateLimitExceeded,
            ErrorCode::Timeout,
        ] {
            assert!(code.is_retryable(), "{code:?} should be retryable");
        }
        for code in [
            ErrorCode::InvalidInput,
            ErrorCode::SchemaValidationFailed,
            ErrorCode::OutputValidationFailed,
            ErrorCode::LowConfidence,
            ErrorCode::BudgetExceeded,
            ErrorCode::GuardrailBlocked,
            ErrorCode::InternalError,
            ErrorCode::UnknownError,
        ] {
            assert!(!code.is_retryable(), "{code:?} should not be retryable");
        }
    }

    #[test]
    fn constructor_derives_retryable_flag() {
        let err = StructuredError::new(
            "signal-intelligence",
            ErrorCode::Timeout,
            "timed out",
            "2026-07-27T00:00:00Z",
            1,
            None,
        );
        assert!(err.retryable);
    }
}
