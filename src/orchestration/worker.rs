//! The external worker contract and the shipped pipeline worker.
//!
//! A worker executes the staged sequence fetch → preprocess → infer →
//! package → callback. The ML computation itself is opaque (behind
//! [`ModelCompute`]), but the staging, progress and error contract is part of
//! the core: the orchestrator's correctness depends on it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::types::{ComputeOutput, JobDispatch, PreparedInput, WorkerResult};
use crate::error::{CoreError, Result};
use crate::models::inference::JobError;

/// Dispatch boundary between the orchestrator and the worker pool.
///
/// `dispatch` runs the whole pipeline for one job; the orchestrator spawns it
/// and never awaits completion on its request path. `abandon` is a
/// best-effort stop signal.
#[async_trait]
pub trait InferenceWorker: Send + Sync {
    async fn dispatch(&self, dispatch: JobDispatch);
    async fn abandon(&self, job_id: Uuid);
}

/// Artifact archive collaborator: fetch by study reference, returning raw
/// artifact bytes grouped by channel type.
#[async_trait]
pub trait ArtifactArchive: Send + Sync {
    async fn fetch_study(&self, study_ref: &str) -> Result<HashMap<String, Vec<Vec<u8>>>>;
}

/// Black-box model execution with known input/output shape.
#[async_trait]
pub trait ModelCompute: Send + Sync {
    async fn run(&self, input: &PreparedInput) -> Result<ComputeOutput>;
}

/// Where terminal results and progress go. In-process this is the
/// orchestrator; across processes, an HTTP client for the callback endpoint.
#[async_trait]
pub trait CallbackSink: Send + Sync {
    async fn report_progress(&self, job_id: Uuid, percent: u8, status_text: &str) -> Result<()>;
    async fn complete(&self, job_id: Uuid, result: WorkerResult) -> Result<()>;
    async fn fail(&self, job_id: Uuid, error: JobError) -> Result<()>;
}

enum PipelineOutcome {
    Finished(WorkerResult),
    Abandoned,
    Failed(CoreError),
}

/// Staged pipeline worker over abstract archive and compute collaborators.
pub struct PipelineWorker {
    archive: Arc<dyn ArtifactArchive>,
    compute: Arc<dyn ModelCompute>,
    callbacks: Arc<dyn CallbackSink>,
    abandoned: DashSet<Uuid>,
}

impl PipelineWorker {
    pub fn new(
        archive: Arc<dyn ArtifactArchive>,
        compute: Arc<dyn ModelCompute>,
        callbacks: Arc<dyn CallbackSink>,
    ) -> Self {
        Self {
            archive,
            compute,
            callbacks,
            abandoned: DashSet::new(),
        }
    }

    /// Progress delivery is advisory; a failed report never stops the
    /// pipeline.
    async fn progress(&self, job_id: Uuid, percent: u8, text: &str) {
        if let Err(e) = self.callbacks.report_progress(job_id, percent, text).await {
            warn!(%job_id, percent, error = %e, "progress report delivery failed");
        }
    }

    fn is_abandoned(&self, job_id: Uuid) -> bool {
        self.abandoned.contains(&job_id)
    }

    async fn execute(&self, dispatch: &JobDispatch) -> PipelineOutcome {
        let job_id = dispatch.job_id;

        // Stage 1: fetch. The empty-channel check runs before any
        // compute-heavy stage.
        self.progress(job_id, 10, "fetching source artifacts").await;
        let mut channels: HashMap<String, Vec<Vec<u8>>> = HashMap::new();
        for spec in &dispatch.fetch_specs {
            let fetched = match self.archive.fetch_study(&spec.study_ref).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    return PipelineOutcome::Failed(CoreError::UpstreamFetchFailed {
                        category: spec.category.clone(),
                        detail: format!("archive fetch for study {} failed: {e}", spec.study_ref),
                    })
                }
            };
            for channel in &spec.channels {
                let items = fetched
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(channel))
                    .map(|(_, items)| items.clone())
                    .unwrap_or_default();
                if items.is_empty() {
                    return PipelineOutcome::Failed(CoreError::UpstreamFetchFailed {
                        category: spec.category.clone(),
                        detail: format!(
                            "required channel {channel} of study {} is empty",
                            spec.study_ref
                        ),
                    });
                }
                channels.entry(channel.clone()).or_default().extend(items);
            }
        }
        if self.is_abandoned(job_id) {
            return PipelineOutcome::Abandoned;
        }

        // Stage 2: preprocess into the model's expected shape.
        self.progress(job_id, 30, "preprocessing").await;
        let input = PreparedInput {
            model_code: dispatch.model_code.clone(),
            channels,
            snapshot: dispatch.input_snapshot.clone(),
        };
        if self.is_abandoned(job_id) {
            return PipelineOutcome::Abandoned;
        }

        // Stage 3: infer (opaque).
        self.progress(job_id, 50, "running inference").await;
        let output = match self.compute.run(&input).await {
            Ok(output) => output,
            Err(e) => return PipelineOutcome::Failed(e),
        };
        self.progress(job_id, 80, "inference finished").await;
        if self.is_abandoned(job_id) {
            return PipelineOutcome::Abandoned;
        }

        // Stage 4: package, bytes only.
        self.progress(job_id, 90, "packaging result").await;
        PipelineOutcome::Finished(WorkerResult {
            summary: output.summary,
            artifacts: output.artifacts,
        })
    }
}

#[async_trait]
impl InferenceWorker for PipelineWorker {
    async fn dispatch(&self, dispatch: JobDispatch) {
        let job_id = dispatch.job_id;
        match self.execute(&dispatch).await {
            PipelineOutcome::Finished(result) => {
                // Stage 5: terminal callback. A delivery failure leaves the
                // job PROCESSING from the orchestrator's view; the watchdog
                // resolves it. The worker itself must not crash.
                if let Err(e) = self.callbacks.complete(job_id, result).await {
                    error!(%job_id, error = %e, "completion callback delivery failed; job left for the watchdog");
                }
            }
            PipelineOutcome::Abandoned => {
                info!(%job_id, "pipeline abandoned before completion");
            }
            PipelineOutcome::Failed(err) => {
                let job_error = match &err {
                    CoreError::UpstreamFetchFailed { .. } => JobError::upstream_fetch(err.to_string()),
                    other => JobError::worker(other.to_string()),
                };
                if let Err(e) = self.callbacks.fail(job_id, job_error).await {
                    error!(%job_id, error = %e, "failure callback delivery failed");
                }
            }
        }
        self.abandoned.remove(&job_id);
    }

    async fn abandon(&self, job_id: Uuid) {
        self.abandoned.insert(job_id);
    }
}
