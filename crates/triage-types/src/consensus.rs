//! The output of the consensus aggregator.

use serde::{Deserialize, Serialize};

/// Why a conflict was raised between two recommendation types or proposers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    /// Two distinct recommendation types disagree by more than the
    /// threshold on their top confidence.
    ActionTypeDivergence,
    /// Proposers of the *same* recommendation type disagree by more than
    /// the threshold on confidence.
    ConfidenceDivergence,
}

/// One detected disagreement among agent recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Kind of conflict.
    pub conflict_type: ConflictType,
    /// The agent ids involved (the top-confidence proposer of each side).
    pub agents: Vec<String>,
    /// Recommendation type(s) this conflict concerns.
    pub recommendation_types: Vec<String>,
    /// How the conflict is resolved downstream.
    pub resolution: String,
}

/// Per-run quality signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Fraction of agents that returned `SUCCESS`.
    pub data_completeness: f64,
    /// Fraction of agents that returned at least one citation.
    pub citation_quality: f64,
    /// Equal to `agreement_level`.
    pub reasoning_coherence: f64,
}

/// Deterministic output of the consensus aggregator.
///
/// Produced exactly once per run by a pure function of
/// `{agent_id -> AgentOutput}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Weighted average confidence across all agent outputs, in `[0, 1]`.
    pub aggregated_confidence: f64,
    /// `1 - σ/0.5` measure of inter-agent agreement, in `[0, 1]`.
    pub agreement_level: f64,
    /// Detected disagreements among recommendations.
    pub conflicts_detected: Vec<ConflictRecord>,
    /// Synthesized recommendation string, truncated to 500 chars.
    pub unified_recommendation: String,
    /// Recommendations that didn't make it into the unified recommendation.
    pub minority_opinions: Vec<String>,
    /// Aggregate quality signals.
    pub quality_metrics: QualityMetrics,
    /// ISO-8601 timestamp of when consensus was computed.
    pub timestamp: String,
}
