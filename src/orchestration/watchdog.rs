//! Stalled-job detection.
//!
//! A background sweep, never a blocking wait inside `submit`: any job with no
//! progress report for the model's expected duration plus the configured
//! grace is marked TIMED_OUT.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::orchestrator::InferenceJobOrchestrator;
use crate::config::CoreConfig;

pub struct Watchdog {
    orchestrator: Arc<InferenceJobOrchestrator>,
    config: CoreConfig,
}

impl Watchdog {
    pub fn new(orchestrator: Arc<InferenceJobOrchestrator>, config: CoreConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// One sweep over all jobs. Exposed so tests can drive it
    /// deterministically.
    pub async fn sweep_once(&self) {
        let now = Utc::now();
        let jobs = self.orchestrator.jobs().all_snapshots().await;
        for job in jobs {
            if job.status.is_terminal() {
                continue;
            }
            let expected = self
                .orchestrator
                .models()
                .get(&job.model_code)
                .map(|m| m.expected_duration(self.config.default_expected_duration))
                .unwrap_or(self.config.default_expected_duration);
            let allowance = expected + self.config.watchdog_grace;
            let allowance = match chrono::Duration::from_std(allowance) {
                Ok(d) => d,
                Err(e) => {
                    warn!(model = %job.model_code, error = %e, "unrepresentable watchdog allowance");
                    continue;
                }
            };
            let deadline = job.last_progress_at + allowance;
            if now <= deadline {
                continue;
            }
            debug!(job_id = %job.job_id, "watchdog found stalled job");
            let detail = format!(
                "no progress since {}; expected duration {:?} plus grace {:?} exceeded",
                job.last_progress_at, expected, self.config.watchdog_grace
            );
            if let Err(e) = self.orchestrator.time_out(job.job_id, detail).await {
                warn!(job_id = %job.job_id, error = %e, "watchdog could not time out job");
            }
        }
    }

    /// Run sweeps forever at the configured interval.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.watchdog_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep_once().await;
            }
        })
    }
}
