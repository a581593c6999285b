//! Inference job endpoints: submission, polling, the worker callback, and
//! cancellation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::actor::Actor;
use crate::models::inference::{InferenceJob, JobError};
use crate::orchestration::worker::CallbackSink;
use crate::orchestration::{JobStatusView, ResultArtifact, WorkerResult};
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub model_code: String,
    pub patient_id: String,
    pub actor: Actor,
    #[serde(default)]
    pub order_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Completed,
    Failed,
}

/// Terminal callback body. Idempotent per the first-terminal-callback-wins
/// rule; re-delivery returns 200 without effect.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub status: CallbackStatus,
    #[serde(default)]
    pub result_summary: Option<Value>,
    #[serde(default)]
    pub error_detail: Option<JobError>,
    #[serde(default)]
    pub artifacts: Vec<ResultArtifact>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub percent: i64,
    pub status_text: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelJobRequest {
    pub actor: Actor,
}

/// POST /v1/jobs
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> ApiResult<(StatusCode, Json<InferenceJob>)> {
    let job = state
        .orchestrator
        .submit(
            &request.model_code,
            &request.patient_id,
            &request.actor,
            request.order_ids.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /v1/jobs/:job_id
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobStatusView>> {
    let view = state.orchestrator.job_status(job_id).await?;
    Ok(Json(view))
}

/// POST /v1/jobs/:job_id/callback
pub async fn callback(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<CallbackRequest>,
) -> ApiResult<StatusCode> {
    match request.status {
        CallbackStatus::Completed => {
            let summary = request
                .result_summary
                .ok_or_else(|| ApiError::bad_request("completed callback requires result_summary"))?;
            CallbackSink::complete(
                state.orchestrator.as_ref(),
                job_id,
                WorkerResult {
                    summary,
                    artifacts: request.artifacts,
                },
            )
            .await?;
        }
        CallbackStatus::Failed => {
            let error = request
                .error_detail
                .ok_or_else(|| ApiError::bad_request("failed callback requires error_detail"))?;
            state.orchestrator.fail(job_id, error).await?;
        }
    }
    Ok(StatusCode::OK)
}

/// POST /v1/jobs/:job_id/progress
pub async fn progress(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<ProgressRequest>,
) -> ApiResult<StatusCode> {
    state
        .orchestrator
        .report_progress(job_id, request.percent, &request.status_text)
        .await?;
    Ok(StatusCode::OK)
}

/// POST /v1/jobs/:job_id/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<CancelJobRequest>,
) -> ApiResult<StatusCode> {
    state.orchestrator.cancel(job_id, &request.actor).await?;
    Ok(StatusCode::ACCEPTED)
}
