//! Static, deploy-time configuration injected into the driver and every
//! node. Configuration is always threaded in by value rather than read
//! from process-wide globals, so pure nodes stay pure and testable.
//!
//! Resolution order: built-in defaults → an optional TOML file → `TRIAGE_`
//! prefixed environment variable overrides. Resolved once at process
//! start by `triage-cli` and then passed by reference everywhere else.

use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A remote agent's stable (agent-id, alias-id) address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEndpoint {
    pub agent_id: String,
    pub alias_id: String,
}

/// Per-token USD pricing for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    /// `estimated_cost`, rounded to 6 decimals.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let raw = (input_tokens as f64 / 1000.0) * self.input_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_per_1k;
        (raw * 1_000_000.0).round() / 1_000_000.0
    }
}

/// Static configuration for one orchestrator deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Stable endpoint for each of the six fixed agent slots.
    pub agent_endpoints: BTreeMap<String, AgentEndpoint>,
    /// Per-model pricing table, keyed by model identifier.
    pub pricing: BTreeMap<String, ModelPricing>,
    /// Static per-agent weight for the consensus aggregator. Agents
    /// absent from this table use [`Self::default_weight`].
    pub weights: BTreeMap<String, f64>,
    /// Weight assigned to an agent with no entry in `weights`. Defaults
    /// to 0.5 for unknown agents.
    pub default_weight: f64,
    /// Safety-guardrail identifier attached to every agent request, if
    /// any.
    pub guardrail_id: Option<String>,
    /// Starting USD budget when the invocation event omits one (default
    /// `5.0`).
    pub default_budget: f64,
    /// Maximum retry attempts per agent (default `2`).
    pub max_retries: u32,
    /// Minimum accepted confidence before a parsed-but-weak response is
    /// classified `LOW_CONFIDENCE`. No concrete threshold is specified
    /// upstream; `0.0` (never triggers) preserves that until a deployment
    /// opts in.
    pub min_confidence: f64,
    /// Per-call timeout, in seconds (default `30`).
    pub per_call_timeout_secs: u64,
    /// Assumed incidents per day for burn projection (default `10`).
    pub incidents_per_day: f64,
    /// Assumed days per month for burn projection (default `30`).
    pub days_per_month: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_endpoints: BTreeMap::new(),
            pricing: BTreeMap::new(),
            weights: BTreeMap::new(),
            default_weight: 0.5,
            guardrail_id: None,
            default_budget: 5.0,
            max_retries: 2,
            min_confidence: 0.0,
            per_call_timeout_secs: 30,
            incidents_per_day: 10.0,
            days_per_month: 30.0,
        }
    }
}

impl OrchestratorConfig {
    /// Parse a TOML document into a config, layered over the defaults
    /// (fields absent from the document keep their default value, via
    /// `#[serde(default)]`).
    pub fn from_toml_str(document: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(document)
    }

    /// Apply `TRIAGE_`-prefixed environment variable overrides on top of
    /// whatever this config already holds. Only scalar fields are
    /// overridable this way; tables (`agent_endpoints`, `pricing`,
    /// `weights`) are TOML-file-only.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(value) = env::var("TRIAGE_DEFAULT_BUDGET") {
            if let Ok(parsed) = value.parse() {
                self.default_budget = parsed;
            }
        }
        if let Ok(value) = env::var("TRIAGE_MAX_RETRIES") {
            if let Ok(parsed) = value.parse() {
                self.max_retries = parsed;
            }
        }
        if let Ok(value) = env::var("TRIAGE_PER_CALL_TIMEOUT_SECS") {
            if let Ok(parsed) = value.parse() {
                self.per_call_timeout_secs = parsed;
            }
        }
        if let Ok(value) = env::var("TRIAGE_GUARDRAIL_ID") {
            self.guardrail_id = Some(value);
        }
        if let Ok(value) = env::var("TRIAGE_INCIDENTS_PER_DAY") {
            if let Ok(parsed) = value.parse() {
                self.incidents_per_day = parsed;
            }
        }
        if let Ok(value) = env::var("TRIAGE_DAYS_PER_MONTH") {
            if let Ok(parsed) = value.parse() {
                self.days_per_month = parsed;
            }
        }
        self
    }

    /// The weight to use for `agent_id` in the consensus aggregator.
    pub fn weight(&self, agent_id: &str) -> f64 {
        self.weights.get(agent_id).copied().unwrap_or(self.default_weight)
    }

    /// Pricing for `model`, if configured.
    pub fn pricing_for(&self, model: &str) -> Option<ModelPricing> {
        self.pricing.get(model).copied()
    }

    /// The configured endpoint for `agent_id`, if any.
    pub fn endpoint_for(&self, agent_id: &str) -> Option<&AgentEndpoint> {
        self.agent_endpoints.get(agent_id)
    }

    /// Per-call timeout as a `Duration`.
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_secs(self.per_call_timeout_secs)
    }

    /// A config with every one of the six fixed agent slots pointed at a
    /// synthetic `(agent_id, agent_id-v1)` endpoint and a flat pricing
    /// entry for `"demo-model"` — used by `triage-cli run` against the
    /// fake transport and by this crate's own tests.
    pub fn demo() -> Self {
        let mut config = Self::default();
        for agent_id in triage_types::AGENT_IDS {
            config.agent_endpoints.insert(
                agent_id.to_string(),
                AgentEndpoint {
                    agent_id: agent_id.to_string(),
                    alias_id: format!("{agent_id}-v1"),
                },
            );
            config.weights.insert(agent_id.to_string(), 0.85);
        }
        config.pricing.insert(
            "demo-model".to_string(),
            ModelPricing { input_per_1k: 0.003, output_per_1k: 0.015 },
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_agent_gets_the_default_weight() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.weight("some-new-agent"), 0.5);
    }

    #[test]
    fn configured_weight_overrides_the_default() {
        let mut config = OrchestratorConfig::default();
        config.weights.insert("signal-intelligence".to_string(), 0.9);
        assert_eq!(config.weight("signal-intelligence"), 0.9);
        assert_eq!(config.weight("historical-pattern"), 0.5);
    }

    #[test]
    fn pricing_rounds_to_six_decimals() {
        let pricing = ModelPricing { input_per_1k: 0.003, output_per_1k: 0.015 };
        assert_eq!(pricing.cost(100, 50), 0.001050);
    }

    #[test]
    fn toml_document_layers_over_defaults() {
        let config = OrchestratorConfig::from_toml_str(
            r#"
            default_budget = 10.0
            max_retries = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.default_budget, 10.0);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.per_call_timeout_secs, 30);
    }

    #[test]
    fn env_overrides_apply_on_top_of_toml() {
        let config = OrchestratorConfig::default();
        std::env::set_var("TRIAGE_MAX_RETRIES", "7");
        let config = config.apply_env_overrides();
        std::env::remove_var("TRIAGE_MAX_RETRIES");
        assert_eq!(config.max_retries, 7);
    }

    #[test]
    fn demo_config_covers_all_six_fixed_agent_slots() {
        let config = OrchestratorConfig::demo();
        for agent_id in triage_types::AGENT_IDS {
            assert!(config.endpoint_for(agent_id).is_some());
        }
    }
}
