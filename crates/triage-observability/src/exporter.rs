//! Structured logging initialization.
//!
//! Leveled, structured console output keyed by
//! `session_id`/`execution_id`/`agent_id` spans. OpenTelemetry OTLP
//! export is not carried forward — see `DESIGN.md`.

use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::ObservabilityConfig;

/// Install a global `tracing` subscriber for the process.
///
/// `RUST_LOG`, if set, takes precedence over `config.log_level`. Safe to
/// call more than once per process (e.g. across tests); later calls are
/// no-ops if a subscriber is already installed.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_does_not_panic_on_repeat_calls() {
        let config = ObservabilityConfig::default();
        init_logging(&config);
        init_logging(&config);
    }
}
