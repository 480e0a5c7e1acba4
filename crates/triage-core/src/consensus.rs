//! The consensus aggregator.
//!
//! A pure function `GraphState -> GraphState`: no I/O, no randomness, no
//! wall-clock dependency beyond timestamping the result. Takes every
//! [`triage_types::AgentOutput`] written so far and reduces it to one
//! [`ConsensusResult`].

use std::collections::BTreeMap;

use chrono::Utc;
use triage_types::{
    hash::round4, AgentOutput, AgentStatus, ConflictRecord, ConflictType, ConsensusResult,
    ExecutionTraceEntry, GraphState, QualityMetrics, TraceStatus,
};

use crate::config::OrchestratorConfig;

const CONFLICT_THRESHOLD: f64 = 0.3;
const MAX_SIGMA: f64 = 0.5;
const UNIFIED_RECOMMENDATION_MAX_LEN: usize = 500;
const DESCRIPTION_TRUNCATE_LEN: usize = 100;
const MINORITY_PREFIX_LEN: usize = 50;

/// One recommendation proposal pulled from a non-FAILURE agent output.
struct Proposal {
    agent_id: String,
    confidence: f64,
    description: String,
}

/// Run the consensus aggregator over every hypothesis recorded so far and
/// append the result to `state`.
///
/// # Panics
///
/// Panics if `state.consensus` is already set — this is a pure node and
/// cannot fail on a valid `GraphState`; a second invocation is a driver
/// bug.
pub fn run(state: GraphState, config: &OrchestratorConfig) -> GraphState {
    let outputs: Vec<&AgentOutput> = state.hypotheses.values().collect();
    let now = Utc::now().to_rfc3339();

    let aggregated_confidence = aggregated_confidence(&outputs, config);
    let agreement_level = agreement_level(&outputs);
    let proposals_by_type = proposals_by_type(&outputs);
    let conflicts = conflicts(&proposals_by_type);
    let unified_recommendation = unified_recommendation(&outputs, &proposals_by_type, &conflicts);
    let minority_opinions = minority_opinions(&outputs, &unified_recommendation);
    let quality_metrics = quality_metrics(&outputs, agreement_level);

    let result = ConsensusResult {
        aggregated_confidence: round4(aggregated_confidence),
        agreement_level: round4(agreement_level),
        conflicts_detected: conflicts,
        unified_recommendation,
        minority_opinions,
        quality_metrics,
        timestamp: now.clone(),
    };

    state
        .with_trace(
            ExecutionTraceEntry::new("consensus", now, TraceStatus::Completed).with_metadata(
                serde_json::json!({
                    "aggregated_confidence": result.aggregated_confidence,
                    "conflicts": result.conflicts_detected.len(),
                }),
            ),
        )
        .with_consensus(result)
}

fn aggregated_confidence(outputs: &[&AgentOutput], config: &OrchestratorConfig) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for output in outputs {
        let weight = config.weight(&output.agent_id);
        weighted_sum += output.confidence * weight;
        weight_total += weight;
    }
    if weight_total == 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

/// `max(0, min(1, 1 - sigma / 0.5))`, where `sigma` is the population
/// standard deviation of confidences.
fn agreement_level(outputs: &[&AgentOutput]) -> f64 {
    if outputs.len() < 2 {
        return 1.0;
    }
    let confidences: Vec<f64> = outputs.iter().map(|o| o.confidence).collect();
    let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
    let variance = confidences.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / confidences.len() as f64;
    let sigma = variance.sqrt();
    if sigma == 0.0 {
        return 1.0;
    }
    (1.0 - sigma / MAX_SIGMA).clamp(0.0, 1.0)
}

fn proposals_by_type(outputs: &[&AgentOutput]) -> BTreeMap<String, Vec<Proposal>> {
    let mut by_type: BTreeMap<String, Vec<Proposal>> = BTreeMap::new();
    for output in outputs {
        if output.status == AgentStatus::Failure {
            continue;
        }
        for recommendation in output.recommendations() {
            by_type.entry(recommendation.rec_type).or_default().push(Proposal {
                agent_id: output.agent_id.clone(),
                confidence: output.confidence,
                description: recommendation.description,
            });
        }
    }
    by_type
}

fn top_proposal(proposals: &[Proposal]) -> &Proposal {
    proposals
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .expect("a recommendation type is only present in the map if it has at least one proposal")
}

fn conflicts(proposals_by_type: &BTreeMap<String, Vec<Proposal>>) -> Vec<ConflictRecord> {
    let mut conflicts = Vec::new();

    // Cross-type: every pair of distinct types whose top confidences differ
    // by more than the threshold.
    let types: Vec<&String> = proposals_by_type.keys().collect();
    for i in 0..types.len() {
        for j in (i + 1)..types.len() {
            let a = top_proposal(&proposals_by_type[types[i]]);
            let b = top_proposal(&proposals_by_type[types[j]]);
            if (a.confidence - b.confidence).abs() > CONFLICT_THRESHOLD {
                conflicts.push(ConflictRecord {
                    conflict_type: ConflictType::ActionTypeDivergence,
                    agents: vec![a.agent_id.clone(), b.agent_id.clone()],
                    recommendation_types: vec![types[i].clone(), types[j].clone()],
                    resolution: "highest confidence wins".to_string(),
                });
            }
        }
    }

    // Within-type: proposers of the same type disagreeing by more than the
    // threshold.
    for (rec_type, proposals) in proposals_by_type {
        if proposals.len() < 2 {
            continue;
        }
        let max_conf = proposals.iter().map(|p| p.confidence).fold(f64::MIN, f64::max);
        let min_conf = proposals.iter().map(|p| p.confidence).fold(f64::MAX, f64::min);
        if max_conf - min_conf > CONFLICT_THRESHOLD {
            let mut agents: Vec<String> = proposals.iter().map(|p| p.agent_id.clone()).collect();
            agents.sort();
            conflicts.push(ConflictRecord {
                conflict_type: ConflictType::ConfidenceDivergence,
                agents,
                recommendation_types: vec![rec_type.clone()],
                resolution: "highest confidence wins".to_string(),
            });
        }
    }

    conflicts
}

fn truncated(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

fn unified_recommendation(
    outputs: &[&AgentOutput],
    proposals_by_type: &BTreeMap<String, Vec<Proposal>>,
    conflicts: &[ConflictRecord],
) -> String {
    if !outputs.is_empty() && outputs.iter().all(|o| o.status == AgentStatus::Failure) {
        return "Insufficient data for recommendation. All agents failed.".to_string();
    }
    if proposals_by_type.is_empty() {
        return "No actionable recommendations.".to_string();
    }

    let total = outputs.len();
    let mut ranked: Vec<(&String, &Vec<Proposal>)> = proposals_by_type.iter().collect();
    ranked.sort_by(|a, b| {
        let max_a = top_proposal(a.1).confidence;
        let max_b = top_proposal(b.1).confidence;
        max_b.total_cmp(&max_a)
    });

    let mut parts = Vec::new();
    let labels = ["PRIMARY", "ALTERNATIVE"];
    for (label, (_rec_type, proposals)) in labels.iter().zip(ranked.iter().take(2)) {
        let top = top_proposal(proposals);
        let n_agree = proposals.len();
        parts.push(format!(
            "{label}: {} (confidence: {:.2}, agents: {n_agree}/{total} agree)",
            truncated(&top.description, DESCRIPTION_TRUNCATE_LEN),
            round4(top.confidence),
        ));
    }

    let conflicts_part = if conflicts.is_empty() {
        "CONFLICTS: None detected".to_string()
    } else {
        format!("CONFLICTS: {} detected", conflicts.len())
    };
    parts.push(conflicts_part);

    let joined = parts.join(" ");
    if joined.chars().count() <= UNIFIED_RECOMMENDATION_MAX_LEN {
        joined
    } else {
        let mut truncated_text: String = joined.chars().take(UNIFIED_RECOMMENDATION_MAX_LEN.saturating_sub(3)).collect();
        truncated_text.push_str("...");
        truncated_text
    }
}

fn minority_opinions(outputs: &[&AgentOutput], unified_recommendation: &str) -> Vec<String> {
    let mut opinions = Vec::new();
    for output in outputs {
        if output.status == AgentStatus::Failure || output.confidence <= 0.5 {
            continue;
        }
        for recommendation in output.recommendations() {
            let prefix = truncated(&recommendation.description, MINORITY_PREFIX_LEN);
            if !unified_recommendation.contains(&prefix) {
                opinions.push(format!(
                    "{} suggests {} (confidence: {:.2})",
                    output.agent_id,
                    truncated(&recommendation.description, DESCRIPTION_TRUNCATE_LEN),
                    round4(output.confidence),
                ));
            }
        }
    }
    opinions
}

fn quality_metrics(outputs: &[&AgentOutput], agreement_level: f64) -> QualityMetrics {
    if outputs.is_empty() {
        return QualityMetrics { data_completeness: 0.0, citation_quality: 0.0, reasoning_coherence: agreement_level };
    }
    let total = outputs.len() as f64;
    let succeeded = outputs.iter().filter(|o| o.status == AgentStatus::Success).count() as f64;
    let cited = outputs
        .iter()
        .filter(|o| o.citations.as_ref().is_some_and(|c| !c.is_empty()))
        .count() as f64;
    QualityMetrics {
        data_completeness: round4(succeeded / total),
        citation_quality: round4(cited / total),
        reasoning_coherence: agreement_level,
    }
}
