//! One agent's verdict for one run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TypeError, TypeResult};
use crate::structured_error::StructuredError;

/// Terminal status of a single agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentStatus {
    /// The agent produced a complete, validated result.
    Success,
    /// The agent produced a usable but incomplete result.
    Partial,
    /// The agent's remote call exceeded its timeout.
    Timeout,
    /// The agent could not be salvaged; this is a failure hypothesis.
    Failure,
}

impl AgentStatus {
    /// Parse from the wire string an agent response uses.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(Self::Success),
            "PARTIAL" => Some(Self::Partial),
            "TIMEOUT" => Some(Self::Timeout),
            "FAILURE" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Token/cost accounting embedded in every [`AgentOutput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCost {
    /// Tokens consumed by the prompt.
    pub input_tokens: u64,
    /// Tokens consumed by the completion.
    pub output_tokens: u64,
    /// Estimated USD cost, rounded to 6 decimals.
    pub estimated_cost: f64,
    /// Model identifier reported by the transport, or `"N/A"` for
    /// pre-invocation failures.
    pub model: String,
}

impl AgentCost {
    /// The `(0, 0, 0.0, "N/A")` sentinel for failures that never reached
    /// the transport.
    pub fn not_applicable() -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            estimated_cost: 0.0,
            model: "N/A".to_string(),
        }
    }
}

/// Replay-verification metadata stamped onto every [`AgentOutput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayMetadata {
    /// Hex-encoded SHA-256 over the whitelisted, canonicalized fields.
    /// `"FAILURE"` for synthesized failure hypotheses.
    pub deterministic_hash: String,
    /// Schema version of this output shape.
    pub schema_version: u32,
}

/// One agent's verdict for one run.
///
/// Once written into [`crate::state::GraphState::hypotheses`] under its
/// `agent_id` key, never overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Which agent produced this output.
    pub agent_id: String,
    /// Version string of the agent that produced this output.
    pub agent_version: String,
    /// Must equal the run's `AgentInput::execution_id`.
    pub execution_id: String,
    /// ISO-8601 timestamp of completion.
    pub timestamp: String,
    /// Wall-clock duration of the invocation, including retries.
    pub duration_ms: u64,
    /// Terminal status of this invocation.
    pub status: AgentStatus,
    /// Self-reported confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Free text, excluded from the deterministic hash.
    pub reasoning: String,
    /// Must contain [`crate::HYPOTHESIS_DISCLAIMER_TOKEN`].
    pub disclaimer: String,
    /// Agent-specific structured findings, including an optional
    /// `recommendations` list consumed by the consensus aggregator.
    pub findings: Value,
    /// Optional list of citation strings.
    pub citations: Option<Vec<String>>,
    /// Token/cost accounting for this invocation.
    pub cost: AgentCost,
    /// Present only when this output is a failure hypothesis.
    pub error: Option<StructuredError>,
    /// Replay-verification metadata.
    pub replay_metadata: ReplayMetadata,
}

impl AgentOutput {
    /// Validate that `disclaimer` carries the required literal token.
    pub fn validate_disclaimer(disclaimer: &str) -> TypeResult<()> {
        if !disclaimer.contains(crate::HYPOTHESIS_DISCLAIMER_TOKEN) {
            return Err(TypeError::MissingDisclaimerToken {
                token: crate::HYPOTHESIS_DISCLAIMER_TOKEN,
            });
        }
        Ok(())
    }

    /// Validate that `confidence` is in `[0.0, 1.0]`.
    pub fn validate_confidence(confidence: f64) -> TypeResult<()> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(TypeError::OutOfRange {
                field: "confidence",
                value: confidence,
            });
        }
        Ok(())
    }

    /// Does this output carry at least one recommendation?
    pub fn recommendations(&self) -> Vec<Recommendation> {
        self.findings
            .get("recommendations")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|item| {
                        let rec_type = item.get("type")?.as_str()?.to_string();
                        let description = item.get("description")?.as_str()?.to_string();
                        Some(Recommendation {
                            rec_type,
                            description,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One `{type, description}` recommendation pulled from an agent's findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    /// The recommendation's type tag (e.g. `"INVESTIGATION"`).
    pub rec_type: String,
    /// Free-text description of the recommendation.
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn disclaimer_must_contain_token() {
        assert!(AgentOutput::validate_disclaimer(
            "This is HYPOTHESIS_ONLY_NOT_AUTHORITATIVE, act accordingly"
        )
        .is_ok());
        assert!(AgentOutput::validate_disclaimer("nope").is_err());
    }

    #[test]
    fn confidence_bounds_enforced() {
        assert!(AgentOutput::validate_confidence(0.0).is_ok());
        assert!(AgentOutput::validate_confidence(1.0).is_ok());
        assert!(AgentOutput::validate_confidence(1.0001).is_err());
        assert!(AgentOutput::validate_confidence(-0.1).is_err());
    }

    #[test]
    fn recommendations_are_extracted_from_findings() {
        let output = AgentOutput {
            agent_id: "signal-intelligence".into(),
            agent_version: "1".into(),
            execution_id: "exec-1".into(),
            timestamp: "2026-07-27T00:00:00Z".into(),
            duration_ms: 10,
            status: AgentStatus::Success,
            confidence: 0.8,
            reasoning: "because".into(),
            disclaimer: "HYPOTHESIS_ONLY_NOT_AUTHORITATIVE".into(),
            findings: json!({
                "recommendations": [
                    {"type": "INVESTIGATION", "description": "check connection pool"}
                ]
            }),
            citations: None,
            cost: AgentCost::not_applicable(),
            error: None,
            replay_metadata: ReplayMetadata {
                deterministic_hash: "abc".into(),
                schema_version: 1,
            },
        };
        let recs = output.recommendations();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].rec_type, "INVESTIGATION");
    }
}
