//! A configurable stand-in for a real Bedrock-agent transport: a
//! per-agent handler closure, a call history, and one-shot failure
//! injection, so `triage run` has something to drive against without a
//! live LLM endpoint.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use triage_core::{AgentRequest, AgentResponse, AgentTransport, TransportError};

/// Handler invoked in place of a real remote call for one agent id.
pub type Handler = Box<dyn Fn(&AgentRequest) -> Result<AgentResponse, TransportError> + Send + Sync>;

/// A fake [`AgentTransport`] whose per-agent behavior is fully
/// configurable: a fixed handler, a one-shot injected failure, or (absent
/// either) a generic `SUCCESS` response built from the request itself.
pub struct FakeAgentTransport {
    handlers: BTreeMap<String, Handler>,
    fail_next: Mutex<BTreeMap<String, TransportError>>,
    call_history: Mutex<Vec<AgentRequest>>,
}

impl Default for FakeAgentTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAgentTransport {
    pub fn new() -> Self {
        Self { handlers: BTreeMap::new(), fail_next: Mutex::new(BTreeMap::new()), call_history: Mutex::new(Vec::new()) }
    }

    /// Install a handler for `agent_id`, replacing the generic default.
    pub fn with_handler(mut self, agent_id: impl Into<String>, handler: Handler) -> Self {
        self.handlers.insert(agent_id.into(), handler);
        self
    }

    /// Make the next call to `agent_id` fail with `error`, then fall back
    /// to the handler/default again.
    pub fn fail_next(&self, agent_id: impl Into<String>, error: TransportError) {
        self.fail_next.lock().expect("fail_next lock poisoned").insert(agent_id.into(), error);
    }

    /// Every request this transport has seen so far, in call order.
    pub fn call_history(&self) -> Vec<AgentRequest> {
        self.call_history.lock().expect("call_history lock poisoned").clone()
    }

    /// How many times `agent_id` has been called.
    pub fn call_count(&self, agent_id: &str) -> usize {
        self.call_history().iter().filter(|r| r.agent_id == agent_id).count()
    }

    fn generic_response(request: &AgentRequest) -> AgentResponse {
        AgentResponse {
            text: json!({
                "confidence": 0.8,
                "status": "SUCCESS",
                "disclaimer": triage_types::HYPOTHESIS_DISCLAIMER_TOKEN,
                "findings": {
                    "recommendations": [{
                        "type": "INVESTIGATION",
                        "description": format!("{} found no anomaly beyond baseline for {}", request.agent_id, request.incident_id),
                    }]
                },
            })
            .to_string(),
            model_id: "demo-model".to_string(),
            model_version: "1".to_string(),
            input_tokens: 250,
            output_tokens: 120,
            guardrail: None,
        }
    }
}

#[async_trait]
impl AgentTransport for FakeAgentTransport {
    async fn invoke(&self, request: AgentRequest) -> Result<AgentResponse, TransportError> {
        self.call_history.lock().expect("call_history lock poisoned").push(request.clone());

        if let Some(error) = self.fail_next.lock().expect("fail_next lock poisoned").remove(&request.agent_id) {
            return Err(error);
        }
        if let Some(handler) = self.handlers.get(&request.agent_id) {
            return handler(&request);
        }
        Ok(Self::generic_response(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(agent_id: &str) -> AgentRequest {
        AgentRequest {
            agent_id: agent_id.to_string(),
            alias_id: format!("{agent_id}-v1"),
            session_id: "session-1".to_string(),
            incident_id: "INC-1".to_string(),
            evidence_bundle: json!({"signals": []}),
            timestamp: "2026-07-27T00:00:00Z".to_string(),
            execution_id: "exec-1".to_string(),
            budget_remaining: 5.0,
            guardrail_id: None,
        }
    }

    #[tokio::test]
    async fn default_response_is_a_success() {
        let transport = FakeAgentTransport::new();
        let response = transport.invoke(request("signal-intelligence")).await.unwrap();
        assert!(response.text.contains("SUCCESS"));
        assert_eq!(transport.call_count("signal-intelligence"), 1);
    }

    #[tokio::test]
    async fn fail_next_is_one_shot() {
        let transport = FakeAgentTransport::new();
        transport.fail_next("signal-intelligence", TransportError::Throttled);

        let first = transport.invoke(request("signal-intelligence")).await;
        assert!(matches!(first, Err(TransportError::Throttled)));

        let second = transport.invoke(request("signal-intelligence")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn custom_handler_overrides_the_default() {
        let transport = FakeAgentTransport::new().with_handler(
            "historical-pattern",
            Box::new(|_req| Err(TransportError::DataSourceUnavailable("history store down".to_string()))),
        );
        let result = transport.invoke(request("historical-pattern")).await;
        assert!(matches!(result, Err(TransportError::DataSourceUnavailable(_))));
    }
}
