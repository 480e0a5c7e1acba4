//! The deterministic-hash whitelist.
//!
//! Scoped as a whitelist, not a blacklist: only the five fields below
//! ever enter the hash. Anything else — `timestamp`, `session_id`,
//! `reasoning`, `disclaimer`, `citations`, `cost`, retry counters — is
//! excluded on purpose so that replay determinism doesn't depend on
//! wall-clock or free-text fields. Drift here silently breaks replay, so
//! this is the single place that builds the hashed payload.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::input::AgentInput;

/// Round a confidence value to 4 decimals, matching the rounding applied
/// before hashing and used throughout consensus arithmetic to eliminate
/// floating-point replay drift.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Compute the hex-encoded SHA-256 deterministic hash for one successful
/// agent invocation.
///
/// `confidence` is rounded to 4 decimals before hashing. `findings` and
/// `evidence_bundle` are hashed via `serde_json`'s default (sorted-key,
/// since this crate does not enable `preserve_order`) rendering, which is
/// the canonical JSON form used throughout.
pub fn compute_deterministic_hash(input: &AgentInput, findings: &Value, confidence: f64) -> String {
    let payload = json!({
        "incident_id": input.incident_id,
        "evidence_bundle": input.evidence_bundle,
        "execution_id": input.execution_id,
        "findings": findings,
        "confidence": round4(confidence),
    });
    // serde_json::Value::Object is backed by a BTreeMap (this crate does
    // not enable the `preserve_order` feature), so `to_string` already
    // yields keys in sorted order at every nesting level.
    let canonical = payload.to_string();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Sentinel hash stored for synthesized failure hypotheses.
pub const FAILURE_HASH: &str = "FAILURE";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input() -> AgentInput {
        AgentInput::new(
            "INC-1",
            json!({"signals": [{"metric": "CPU", "value": 95.5}]}),
            "2026-07-27T00:00:00Z",
            "exec-1",
            "session-1",
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn same_input_same_findings_same_confidence_hash_identically() {
        let input = input();
        let findings = json!({"recommendations": [{"type": "INVESTIGATION", "description": "x"}]});
        let h1 = compute_deterministic_hash(&input, &findings, 0.8);
        let h2 = compute_deterministic_hash(&input, &findings, 0.8);
        assert_eq!(h1, h2);
    }

    #[test]
    fn timestamp_and_reasoning_do_not_affect_hash() {
        let input = input();
        let mut other = input.clone();
        other.timestamp = "2099-01-01T00:00:00Z".to_string();
        other.session_id = "a-totally-different-session".to_string();
        let findings = json!({"foo": "bar"});
        assert_eq!(
            compute_deterministic_hash(&input, &findings, 0.5),
            compute_deterministic_hash(&other, &findings, 0.5)
        );
    }

    #[test]
    fn confidence_rounds_to_four_decimals_before_hashing() {
        let input = input();
        let findings = json!({"foo": "bar"});
        let h1 = compute_deterministic_hash(&input, &findings, 0.12345);
        let h2 = compute_deterministic_hash(&input, &findings, 0.12349);
        assert_eq!(h1, h2, "both round to 0.1235 (ties-away-from-zero) or 0.1234/0.1235 distinctly");
    }

    #[test]
    fn different_findings_change_the_hash() {
        let input = input();
        let h1 = compute_deterministic_hash(&input, &json!({"a": 1}), 0.5);
        let h2 = compute_deterministic_hash(&input, &json!({"a": 2}), 0.5);
        assert_ne!(h1, h2);
    }
}
