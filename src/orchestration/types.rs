//! Core types shared across the orchestration components.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::inference::JobError;
use crate::state_machine::states::JobState;

/// One artifact fetch a worker must perform before computing: which study to
/// pull and which channels of it are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSpec {
    pub category: String,
    pub study_ref: String,
    pub channels: Vec<String>,
}

/// Everything a worker needs to execute one job. Crosses the dispatch
/// boundary by value; no shared mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDispatch {
    pub job_id: Uuid,
    pub model_code: String,
    pub patient_id: String,
    pub references: Vec<Uuid>,
    pub input_snapshot: Value,
    pub fetch_specs: Vec<FetchSpec>,
}

/// Large output transmitted as bytes. Never a local file path: the worker
/// and orchestrator do not share a filesystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Packaged, transport-agnostic result of a finished pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResult {
    pub summary: Value,
    #[serde(default)]
    pub artifacts: Vec<ResultArtifact>,
}

/// Fetched artifacts shaped for the model, ready for inference.
#[derive(Debug, Clone)]
pub struct PreparedInput {
    pub model_code: String,
    /// Channel type -> raw artifact bytes, one entry per fetched item.
    pub channels: HashMap<String, Vec<Vec<u8>>>,
    pub snapshot: Value,
}

/// Output of the opaque compute stage.
#[derive(Debug, Clone)]
pub struct ComputeOutput {
    pub summary: Value,
    pub artifacts: Vec<ResultArtifact>,
}

/// Read view for polling clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: Uuid,
    pub status: JobState,
    pub progress_percent: u8,
    pub progress_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<JobError>,
}
