use std::time::Duration;

use crate::error::{CoreError, Result};

/// Runtime configuration for the orchestration core.
///
/// Values come from `Default` with `CLINFLOW_*` environment overrides.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Capacity of the broadcast channel behind the event publisher.
    pub event_channel_capacity: usize,
    /// How often the watchdog sweeps for stalled jobs.
    pub watchdog_interval: Duration,
    /// Grace period added to a model's expected duration before a job with no
    /// progress is considered stalled.
    pub watchdog_grace: Duration,
    /// Expected duration assumed for models that do not declare one.
    pub default_expected_duration: Duration,
    /// Bind address for the web boundary.
    pub bind_address: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 1000,
            watchdog_interval: Duration::from_secs(30),
            watchdog_grace: Duration::from_secs(300),
            default_expected_duration: Duration::from_secs(120),
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(capacity) = std::env::var("CLINFLOW_EVENT_CHANNEL_CAPACITY") {
            config.event_channel_capacity = capacity.parse().map_err(|e| {
                CoreError::Configuration(format!("Invalid event_channel_capacity: {e}"))
            })?;
        }

        if let Ok(interval_ms) = std::env::var("CLINFLOW_WATCHDOG_INTERVAL_MS") {
            config.watchdog_interval = Duration::from_millis(interval_ms.parse().map_err(
                |e| CoreError::Configuration(format!("Invalid watchdog_interval_ms: {e}")),
            )?);
        }

        if let Ok(grace_ms) = std::env::var("CLINFLOW_WATCHDOG_GRACE_MS") {
            config.watchdog_grace = Duration::from_millis(grace_ms.parse().map_err(|e| {
                CoreError::Configuration(format!("Invalid watchdog_grace_ms: {e}"))
            })?);
        }

        if let Ok(duration_ms) = std::env::var("CLINFLOW_DEFAULT_EXPECTED_DURATION_MS") {
            config.default_expected_duration =
                Duration::from_millis(duration_ms.parse().map_err(|e| {
                    CoreError::Configuration(format!("Invalid default_expected_duration_ms: {e}"))
                })?);
        }

        if let Ok(bind) = std::env::var("CLINFLOW_BIND_ADDRESS") {
            config.bind_address = bind;
        }

        Ok(config)
    }
}
