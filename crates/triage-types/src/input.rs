//! The immutable evidence envelope that flows unchanged through a run.

use crate::error::{TypeError, TypeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Evidence and identifiers for one orchestration run.
///
/// Frozen once, at graph entry: every [`GraphState`] derived from the
/// same run carries a byte-for-byte identical copy.
///
/// [`GraphState`]: crate::state::GraphState
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInput {
    /// Identity of the incident this run is diagnosing. Non-empty.
    pub incident_id: String,
    /// Arbitrary JSON snapshot of telemetry collected by external
    /// evidence-gatherers. Must be a non-empty JSON object.
    pub evidence_bundle: Value,
    /// ISO-8601 timestamp, kept so a replay can be compared against the
    /// original run.
    pub timestamp: String,
    /// Unique identifier for this orchestration run.
    pub execution_id: String,
    /// Groups checkpoints belonging to one logical (possibly resumed) run.
    pub session_id: String,
    /// Optional free-form context supplied by the caller.
    pub context: Option<Value>,
    /// Optional metadata describing a replay (e.g. the run being replayed).
    pub replay_metadata: Option<Value>,
}

impl AgentInput {
    /// Validate and construct an `AgentInput`.
    ///
    /// Every string field must be non-empty and `evidence_bundle` must be
    /// a non-empty JSON object.
    pub fn new(
        incident_id: impl Into<String>,
        evidence_bundle: Value,
        timestamp: impl Into<String>,
        execution_id: impl Into<String>,
        session_id: impl Into<String>,
        context: Option<Value>,
        replay_metadata: Option<Value>,
    ) -> TypeResult<Self> {
        let incident_id = incident_id.into();
        let timestamp = timestamp.into();
        let execution_id = execution_id.into();
        let session_id = session_id.into();

        if incident_id.is_empty() {
            return Err(TypeError::EmptyField {
                field: "incident_id",
            });
        }
        if timestamp.is_empty() {
            return Err(TypeError::EmptyField { field: "timestamp" });
        }
        if execution_id.is_empty() {
            return Err(TypeError::EmptyField {
                field: "execution_id",
            });
        }
        if session_id.is_empty() {
            return Err(TypeError::EmptyField { field: "session_id" });
        }
        match &evidence_bundle {
            Value::Object(map) if !map.is_empty() => {}
            _ => {
                return Err(TypeError::NotAnObject {
                    field: "evidence_bundle",
                })
            }
        }

        Ok(Self {
            incident_id,
            evidence_bundle,
            timestamp,
            execution_id,
            session_id,
            context,
            replay_metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> TypeResult<AgentInput> {
        AgentInput::new(
            "INC-1",
            json!({"signals": []}),
            "2026-07-27T00:00:00Z",
            "exec-1",
            "session-1",
            None,
            None,
        )
    }

    #[test]
    fn accepts_well_formed_input() {
        assert!(valid().is_ok());
    }

    #[test]
    fn rejects_empty_incident_id() {
        let err = AgentInput::new(
            "",
            json!({"a": 1}),
            "2026-07-27T00:00:00Z",
            "exec-1",
            "session-1",
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TypeError::EmptyField {
                field: "incident_id"
            }
        );
    }

    #[test]
    fn rejects_empty_evidence_bundle() {
        let err = AgentInput::new(
            "INC-1",
            json!({}),
            "2026-07-27T00:00:00Z",
            "exec-1",
            "session-1",
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TypeError::NotAnObject {
                field: "evidence_bundle"
            }
        );
    }

    #[test]
    fn rejects_non_object_evidence_bundle() {
        let err = AgentInput::new(
            "INC-1",
            json!([1, 2, 3]),
            "2026-07-27T00:00:00Z",
            "exec-1",
            "session-1",
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TypeError::NotAnObject {
                field: "evidence_bundle"
            }
        );
    }
}
