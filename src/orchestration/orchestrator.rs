use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{FetchSpec, JobDispatch, JobStatusView, WorkerResult};
use super::worker::{CallbackSink, InferenceWorker};
use crate::error::{CoreError, Result};
use crate::events::fanout::NotificationFanout;
use crate::models::actor::Actor;
use crate::models::inference::{InferenceJob, InferenceModel, JobError, ModelRegistry};
use crate::models::order::Order;
use crate::resolver::{self, RequirementKey};
use crate::state_machine::states::JobState;
use crate::store::{JobStore, OrderStore};

/// Accepts inference requests, assigns them to the worker boundary, tracks
/// lifecycle, applies callback results and finalizes state.
///
/// Callbacks for one job are serialized by the job record's mutex; the state
/// guard on top of that makes "first terminal callback wins" race-free: once
/// a job is terminal, every further callback is accepted, logged and
/// discarded without effect and without error to the caller.
pub struct InferenceJobOrchestrator {
    orders: Arc<OrderStore>,
    jobs: Arc<JobStore>,
    models: Arc<ModelRegistry>,
    fanout: NotificationFanout,
    worker: RwLock<Option<Arc<dyn InferenceWorker>>>,
}

impl InferenceJobOrchestrator {
    pub fn new(
        orders: Arc<OrderStore>,
        jobs: Arc<JobStore>,
        models: Arc<ModelRegistry>,
        fanout: NotificationFanout,
    ) -> Self {
        Self {
            orders,
            jobs,
            models,
            fanout,
            worker: RwLock::new(None),
        }
    }

    /// Wire the worker boundary. Done after construction because an
    /// in-process worker calls back into the orchestrator.
    pub fn set_worker(&self, worker: Arc<dyn InferenceWorker>) {
        *self.worker.write() = Some(worker);
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    pub fn models(&self) -> &Arc<ModelRegistry> {
        &self.models
    }

    /// Submit one execution of a model against a patient.
    ///
    /// Runs the requirement resolver synchronously; dispatch to the worker is
    /// spawned, so this returns as soon as the PENDING job is persisted. When
    /// any required key is missing no job record is created at all.
    pub async fn submit(
        &self,
        model_code: &str,
        patient_id: &str,
        requester: &Actor,
        explicit_order_ids: Option<&[Uuid]>,
    ) -> Result<InferenceJob> {
        let model = self
            .models
            .get(model_code)
            .ok_or_else(|| CoreError::not_found(format!("model {model_code}")))?;

        let orders = self.orders.orders_for_patient(patient_id).await;
        let resolution = resolver::resolve(&model, &orders, explicit_order_ids);
        if !resolution.is_ready() {
            return Err(CoreError::InputNotReady {
                missing: resolution.missing,
            });
        }

        let job = InferenceJob::new(
            model.code.clone(),
            patient_id,
            resolution.compatible_order_ids.clone(),
            resolution.snapshot.clone(),
        );
        let fetch_specs = build_fetch_specs(&model, &resolution.source_orders, &orders);

        let snapshot = job.clone();
        self.jobs.insert(job);
        info!(job_id = %snapshot.job_id, model = model_code, requester = %requester, "inference job submitted");
        self.fanout.job_event("job.submitted", &snapshot);

        let dispatch = JobDispatch {
            job_id: snapshot.job_id,
            model_code: snapshot.model_code.clone(),
            patient_id: snapshot.patient_id.clone(),
            references: snapshot.references.clone(),
            input_snapshot: snapshot.input_snapshot.clone(),
            fetch_specs,
        };
        match self.worker.read().clone() {
            Some(worker) => {
                tokio::spawn(async move {
                    worker.dispatch(dispatch).await;
                });
            }
            // No worker wired: the job stays PENDING until the watchdog
            // times it out.
            None => warn!(job_id = %snapshot.job_id, "no inference worker configured"),
        }

        Ok(snapshot)
    }

    /// Apply a progress report. The first report moves PENDING→PROCESSING.
    /// Out-of-range percentages are clamped; regressions are accepted and
    /// logged to tolerate out-of-order delivery.
    pub async fn report_progress(
        &self,
        job_id: Uuid,
        percent: i64,
        status_text: &str,
    ) -> Result<()> {
        let entry = self
            .jobs
            .entry(job_id)
            .ok_or_else(|| CoreError::not_found(format!("job {job_id}")))?;
        let mut job = entry.lock().await;

        if job.status.is_terminal() {
            debug!(%job_id, status = %job.status, "progress report after terminal state discarded");
            return Ok(());
        }

        let clamped = percent.clamp(0, 100) as u8;
        if clamped < job.progress_percent {
            warn!(
                %job_id,
                last = job.progress_percent,
                reported = clamped,
                "stale progress report accepted"
            );
        }

        let now = Utc::now();
        if job.status == JobState::Pending {
            job.status = JobState::Processing;
            job.started_at = Some(now);
            self.fanout.job_event("job.started", &job);
        }
        job.progress_percent = clamped;
        job.progress_text = status_text.to_string();
        job.last_progress_at = now;
        Ok(())
    }

    /// Record a successful terminal callback. Legal only from PROCESSING: a
    /// worker must have reported progress at least once before completing.
    /// Idempotent: a repeated call on an already-terminal job is a logged
    /// no-op.
    pub async fn complete(&self, job_id: Uuid, result_summary: Value) -> Result<()> {
        let entry = self
            .jobs
            .entry(job_id)
            .ok_or_else(|| CoreError::not_found(format!("job {job_id}")))?;
        let mut job = entry.lock().await;

        if job.status.is_terminal() {
            info!(%job_id, status = %job.status, "duplicate terminal callback discarded");
            return Ok(());
        }
        if job.status != JobState::Processing {
            return Err(CoreError::illegal_job_transition(job.status, "complete"));
        }

        let now = Utc::now();
        job.status = JobState::Completed;
        job.result_summary = Some(result_summary);
        job.error_detail = None;
        job.progress_percent = 100;
        job.progress_text = "completed".to_string();
        job.completed_at = Some(now);
        job.last_progress_at = now;
        info!(%job_id, "inference job completed");
        self.fanout.job_event("job.completed", &job);
        Ok(())
    }

    /// Record a failure terminal callback. Same idempotence rule as
    /// [`complete`](Self::complete).
    pub async fn fail(&self, job_id: Uuid, error: JobError) -> Result<()> {
        let entry = self
            .jobs
            .entry(job_id)
            .ok_or_else(|| CoreError::not_found(format!("job {job_id}")))?;
        let mut job = entry.lock().await;

        if job.status.is_terminal() {
            info!(%job_id, status = %job.status, "duplicate terminal callback discarded");
            return Ok(());
        }

        let now = Utc::now();
        job.status = JobState::Failed;
        job.result_summary = None;
        job.progress_text = format!("failed: {}", error.message);
        job.error_detail = Some(error);
        job.completed_at = Some(now);
        job.last_progress_at = now;
        warn!(%job_id, detail = %job.error_detail.as_ref().map(|e| e.message.as_str()).unwrap_or(""), "inference job failed");
        self.fanout.job_event("job.failed", &job);
        Ok(())
    }

    /// Cancel a job. Best-effort and asynchronous towards the worker: intent
    /// is marked immediately, but a worker that already reached a terminal
    /// state wins the race and the later cancel is discarded.
    pub async fn cancel(&self, job_id: Uuid, actor: &Actor) -> Result<()> {
        let entry = self
            .jobs
            .entry(job_id)
            .ok_or_else(|| CoreError::not_found(format!("job {job_id}")))?;
        let mut job = entry.lock().await;

        if job.status.is_terminal() {
            info!(%job_id, status = %job.status, actor = %actor, "cancel after terminal state discarded");
            return Ok(());
        }

        let now = Utc::now();
        job.status = JobState::Cancelled;
        job.progress_text = format!("cancelled by {}", actor.id);
        job.completed_at = Some(now);
        job.last_progress_at = now;
        info!(%job_id, actor = %actor, "inference job cancelled");
        self.fanout.job_event("job.cancelled", &job);
        drop(job);

        if let Some(worker) = self.worker.read().clone() {
            tokio::spawn(async move {
                worker.abandon(job_id).await;
            });
        }
        Ok(())
    }

    /// Watchdog path: mark a stalled job TIMED_OUT. Terminal jobs win as
    /// with any other late signal.
    pub async fn time_out(&self, job_id: Uuid, detail: impl Into<String>) -> Result<()> {
        let entry = self
            .jobs
            .entry(job_id)
            .ok_or_else(|| CoreError::not_found(format!("job {job_id}")))?;
        let mut job = entry.lock().await;

        if job.status.is_terminal() {
            debug!(%job_id, status = %job.status, "timeout sweep found job already terminal");
            return Ok(());
        }

        let now = Utc::now();
        let error = JobError::timeout(detail);
        job.status = JobState::TimedOut;
        job.result_summary = None;
        job.progress_text = format!("timed out: {}", error.message);
        job.error_detail = Some(error);
        job.completed_at = Some(now);
        job.last_progress_at = now;
        warn!(%job_id, "inference job timed out");
        self.fanout.job_event("job.timed_out", &job);
        Ok(())
    }

    /// Read endpoint for polling clients.
    pub async fn job_status(&self, job_id: Uuid) -> Result<JobStatusView> {
        let job = self
            .jobs
            .snapshot(job_id)
            .await
            .ok_or_else(|| CoreError::not_found(format!("job {job_id}")))?;
        Ok(JobStatusView {
            job_id: job.job_id,
            status: job.status,
            progress_percent: job.progress_percent,
            progress_text: job.progress_text,
            error_detail: job.error_detail,
        })
    }
}

/// The orchestrator is itself the in-process callback sink for the pipeline
/// worker.
#[async_trait]
impl CallbackSink for InferenceJobOrchestrator {
    async fn report_progress(&self, job_id: Uuid, percent: u8, status_text: &str) -> Result<()> {
        InferenceJobOrchestrator::report_progress(self, job_id, i64::from(percent), status_text)
            .await
    }

    async fn complete(&self, job_id: Uuid, result: WorkerResult) -> Result<()> {
        // Artifact bytes are acknowledged by size only in the stored summary;
        // the payload itself crossed the boundary by value.
        let mut summary = result.summary;
        if !result.artifacts.is_empty() {
            let listing: Vec<Value> = result
                .artifacts
                .iter()
                .map(|a| {
                    json!({
                        "name": a.name,
                        "content_type": a.content_type,
                        "size_bytes": a.bytes.len(),
                    })
                })
                .collect();
            match &mut summary {
                Value::Object(map) => {
                    map.insert("artifacts".to_string(), Value::Array(listing));
                }
                other => {
                    let mut map = serde_json::Map::new();
                    map.insert("value".to_string(), other.take());
                    map.insert("artifacts".to_string(), Value::Array(listing));
                    summary = Value::Object(map);
                }
            }
        }
        InferenceJobOrchestrator::complete(self, job_id, summary).await
    }

    async fn fail(&self, job_id: Uuid, error: JobError) -> Result<()> {
        InferenceJobOrchestrator::fail(self, job_id, error).await
    }
}

/// Derive the artifact fetches for a dispatch from the model's series-channel
/// keys and the orders selected per source. Sources without series keys
/// (e.g. lab) need no artifact fetch.
fn build_fetch_specs(
    model: &InferenceModel,
    source_orders: &std::collections::BTreeMap<String, Uuid>,
    orders: &[Order],
) -> Vec<FetchSpec> {
    let mut specs = Vec::new();
    for source in &model.sources {
        let channels: Vec<String> = source
            .required_keys
            .iter()
            .filter_map(|raw| match RequirementKey::parse(raw) {
                RequirementKey::SeriesChannel { channel, .. } => Some(channel),
                RequirementKey::Path { .. } => None,
            })
            .collect();
        if channels.is_empty() {
            continue;
        }
        let Some(order_id) = source_orders.get(&source.category) else {
            continue;
        };
        let Some(order) = orders.iter().find(|o| o.order_id == *order_id) else {
            continue;
        };
        let study_ref = order
            .result_payload
            .get("dicom")
            .and_then(|d| d.get("study_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| order_id.to_string());
        specs.push(FetchSpec {
            category: source.category.clone(),
            study_ref,
            channels,
        });
    }
    specs
}
