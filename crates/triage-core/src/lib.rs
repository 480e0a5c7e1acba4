//! The orchestration kernel: agent invoker, consensus aggregator, cost
//! guardian, and graph driver.
//!
//! Everything here is built on the value objects in `triage-types`. This
//! crate owns *behavior*: how one agent call is retried and classified
//! (`invoker`), how six completed hypotheses become one recommendation
//! (`consensus`), how that recommendation's cost is booked against budget
//! (`cost_guardian`), and how the fixed topology is walked and
//! crash-resumed (`driver`).

pub mod config;
pub mod consensus;
pub mod cost_guardian;
pub mod driver;
pub mod error;
pub mod invoker;
pub mod transport;

pub use config::{AgentEndpoint, ModelPricing, OrchestratorConfig};
pub use driver::{ExecutionSummary, IncidentEvent, RecommendationSummary, TerminalOutput};
pub use error::{CoreError, CoreResult};
pub use transport::{AgentRequest, AgentResponse, AgentTransport, GuardrailAction, GuardrailSignal, TransportError};
