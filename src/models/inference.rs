use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::state_machine::states::JobState;

/// One upstream order category a model depends on, with the dotted keys that
/// must resolve in that source's result payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSource {
    /// Order category, e.g. `RIS`.
    pub category: String,
    /// Dotted requirement keys, e.g. `dicom.T1` or `report.impression`.
    pub required_keys: Vec<String>,
}

/// Declares an analysis capability. Immutable reference data; versioned
/// externally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceModel {
    pub code: String,
    pub name: String,
    pub sources: Vec<ModelSource>,
    /// Expected wall-clock duration of one execution, in milliseconds. Used
    /// by the watchdog; jobs of models without a declared duration fall back
    /// to the configured default.
    pub expected_duration_ms: Option<u64>,
}

impl InferenceModel {
    pub fn expected_duration(&self, default: Duration) -> Duration {
        self.expected_duration_ms
            .map(Duration::from_millis)
            .unwrap_or(default)
    }

    pub fn source(&self, category: &str) -> Option<&ModelSource> {
        self.sources
            .iter()
            .find(|s| s.category.eq_ignore_ascii_case(category))
    }
}

/// In-process registry of known inference models, keyed by code.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: DashMap<String, Arc<InferenceModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, model: InferenceModel) {
        self.models.insert(model.code.clone(), Arc::new(model));
    }

    pub fn get(&self, code: &str) -> Option<Arc<InferenceModel>> {
        self.models.get(code).map(|entry| Arc::clone(entry.value()))
    }

    pub fn codes(&self) -> Vec<String> {
        self.models.iter().map(|e| e.key().clone()).collect()
    }
}

/// Classifies why a job ended in FAILED or TIMED_OUT, so operators can tell
/// "the pipeline errored" from "the pipeline vanished".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    WorkerError,
    UpstreamFetch,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
}

impl JobError {
    pub fn worker(message: impl Into<String>) -> Self {
        Self {
            kind: JobErrorKind::WorkerError,
            message: message.into(),
        }
    }

    pub fn upstream_fetch(message: impl Into<String>) -> Self {
        Self {
            kind: JobErrorKind::UpstreamFetch,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: JobErrorKind::Timeout,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// One asynchronous execution of an [`InferenceModel`] against a patient.
///
/// Retained indefinitely for audit; superseded by new jobs, never deleted.
/// Holds non-owning references (order ids) to the orders it consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceJob {
    pub job_id: Uuid,
    pub model_code: String,
    pub patient_id: String,
    /// Contributing order ids.
    pub references: Vec<Uuid>,
    /// Resolved input values at submission time, nested as
    /// `{category: {key: value}}`.
    pub input_snapshot: Value,
    pub status: JobState,
    pub progress_percent: u8,
    pub progress_text: String,
    /// Present iff status = COMPLETED.
    pub result_summary: Option<Value>,
    /// Present iff status = FAILED or TIMED_OUT.
    pub error_detail: Option<JobError>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Refreshed by every progress report; drives the watchdog.
    pub last_progress_at: DateTime<Utc>,
}

impl InferenceJob {
    pub fn new(
        model_code: impl Into<String>,
        patient_id: impl Into<String>,
        references: Vec<Uuid>,
        input_snapshot: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            model_code: model_code.into(),
            patient_id: patient_id.into(),
            references,
            input_snapshot,
            status: JobState::Pending,
            progress_percent: 0,
            progress_text: "queued".to_string(),
            result_summary: None,
            error_detail: None,
            submitted_at: now,
            started_at: None,
            completed_at: None,
            last_progress_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_round_trip() {
        let registry = ModelRegistry::new();
        registry.register(InferenceModel {
            code: "M1".to_string(),
            name: "Brain segmentation".to_string(),
            sources: vec![ModelSource {
                category: "RIS".to_string(),
                required_keys: vec!["dicom.T1".to_string()],
            }],
            expected_duration_ms: Some(60_000),
        });
        let model = registry.get("M1").unwrap();
        assert_eq!(model.source("ris").unwrap().required_keys.len(), 1);
        assert!(registry.get("M2").is_none());
    }

    #[test]
    fn expected_duration_falls_back_to_default() {
        let model = InferenceModel {
            code: "M2".to_string(),
            name: "Unhurried".to_string(),
            sources: vec![],
            expected_duration_ms: None,
        };
        let default = Duration::from_secs(120);
        assert_eq!(model.expected_duration(default), default);
    }

    #[test]
    fn new_job_is_pending_with_zero_progress() {
        let job = InferenceJob::new("M1", "patient-1", vec![], serde_json::json!({}));
        assert_eq!(job.status, JobState::Pending);
        assert_eq!(job.progress_percent, 0);
        assert!(job.result_summary.is_none());
        assert!(job.error_detail.is_none());
    }
}
