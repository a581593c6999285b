//! Structured logging setup.
//!
//! Console output with an environment-driven filter; `CLINFLOW_LOG_JSON=1`
//! switches to JSON lines for log shippers.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process.
///
/// Safe to call from every test and binary entry point; subsequent calls are
/// no-ops, and an already-installed global subscriber is tolerated.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_env("CLINFLOW_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let json = std::env::var("CLINFLOW_LOG_JSON").map(|v| v == "1").unwrap_or(false);

        let result = if json {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(true))
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true))
                .try_init()
        };

        if result.is_err() {
            // Another subscriber is already installed (e.g. by the test
            // harness); keep using it.
            tracing::debug!("global tracing subscriber already set");
        }
    });
}
