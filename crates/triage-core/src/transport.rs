//! The boundary between the invoker and a real agent backend.
//!
//! The real Bedrock-agent endpoint is out of scope; this crate only defines
//! the contract a caller's transport must satisfy. `triage-cli` ships a
//! `FakeAgentTransport` against this same trait for local demos and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the invoker sends to an agent's remote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub agent_id: String,
    pub alias_id: String,
    pub session_id: String,
    pub incident_id: String,
    pub evidence_bundle: Value,
    pub timestamp: String,
    pub execution_id: String,
    pub budget_remaining: f64,
    pub guardrail_id: Option<String>,
}

/// The guardrail action attached to a response, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuardrailAction {
    Blocked,
    Warn,
}

/// Guardrail metadata carried alongside a raw response. `confidence`
/// defaults to 1.0 when the transport omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailSignal {
    pub action: GuardrailAction,
    pub confidence: Option<f64>,
    pub violation_type: Option<String>,
    pub category: Option<String>,
}

/// The raw, still-unvalidated response a transport hands back after
/// concatenating its streamed chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Concatenation of all streamed text chunks. Empty means the stream
    /// produced nothing and the invoker treats this as
    /// `OUTPUT_VALIDATION_FAILED`.
    pub text: String,
    pub model_id: String,
    pub model_version: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub guardrail: Option<GuardrailSignal>,
}

/// Failure modes a transport call can raise, pre-classification. The
/// invoker maps each variant onto an [`crate::error::ErrorCode`]-equivalent
/// via [`triage_types::ErrorCode`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("throttled by the LLM provider")]
    Throttled,
    #[error("data source unavailable: {0}")]
    DataSourceUnavailable(String),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("call timed out")]
    TimedOut,
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),
    #[error("transport error: {0}")]
    Other(String),
}

pub type TransportResult = Result<AgentResponse, TransportError>;

/// What the invoker requires of an agent backend.
///
/// Implementors own everything past request assembly: dispatching the call,
/// imposing (or not) their own internal timeout, and reporting exactly one
/// of a well-formed [`AgentResponse`] or a classified [`TransportError`].
/// The invoker applies the per-call timeout in [`crate::config::OrchestratorConfig`]
/// around this call; a transport that never returns will surface as
/// [`TransportError::TimedOut`] from the invoker's own wrapping, not from
/// the transport itself.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn invoke(&self, request: AgentRequest) -> TransportResult;
}
