//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use uuid::Uuid;

use clinflow_core::config::CoreConfig;
use clinflow_core::error::Result;
use clinflow_core::models::actor::Actor;
use clinflow_core::models::inference::{InferenceModel, ModelSource};
use clinflow_core::models::order::Order;
use clinflow_core::orchestration::worker::{ArtifactArchive, InferenceWorker, ModelCompute};
use clinflow_core::orchestration::{ComputeOutput, JobDispatch, PreparedInput};
use clinflow_core::state_machine::order_state_machine::CreateOrderRequest;
use clinflow_core::system::CoreSystem;

pub fn test_config() -> CoreConfig {
    CoreConfig {
        event_channel_capacity: 64,
        watchdog_interval: Duration::from_millis(10),
        watchdog_grace: Duration::from_millis(0),
        default_expected_duration: Duration::from_millis(5),
        ..CoreConfig::default()
    }
}

pub fn test_system() -> CoreSystem {
    let system = CoreSystem::new(test_config());
    system.models.register(brain_model());
    system
}

pub fn physician() -> Actor {
    Actor::physician("dr-kim")
}

pub fn tech() -> Actor {
    Actor::worker("tech-lee")
}

/// Model `M1`: requires four MRI channels from a confirmed RIS order.
pub fn brain_model() -> InferenceModel {
    InferenceModel {
        code: "M1".to_string(),
        name: "Brain tumor segmentation".to_string(),
        sources: vec![ModelSource {
            category: "RIS".to_string(),
            required_keys: vec![
                "dicom.T1".to_string(),
                "dicom.T2".to_string(),
                "dicom.T1C".to_string(),
                "dicom.FLAIR".to_string(),
            ],
        }],
        expected_duration_ms: Some(5),
    }
}

/// Result payload with all four channels, mixed casing on purpose.
pub fn four_series_result() -> Value {
    json!({
        "dicom": {
            "study_id": "1.2.840.10008.999",
            "series": [
                {"channelType": "t1", "uid": "s1"},
                {"channelType": "T2", "uid": "s2"},
                {"channel_type": "T1c", "uid": "s3"},
                {"channel_type": "flair", "uid": "s4"},
            ]
        }
    })
}

pub fn create_request(patient: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        requester: physician(),
        patient_id: patient.to_string(),
        category: "RIS".to_string(),
        work_type: "MRI_BRAIN".to_string(),
        priority: Default::default(),
        request_payload: json!({"region": "brain"}),
    }
}

/// Walk one order through the whole happy path and return the confirmed
/// snapshot.
pub async fn confirmed_ris_order(system: &CoreSystem, patient: &str) -> Order {
    let sm = &system.state_machine;
    let order = sm.create(create_request(patient)).await.unwrap();
    sm.accept(order.order_id, &tech()).await.unwrap();
    sm.start(order.order_id, &tech()).await.unwrap();
    sm.save_result(order.order_id, &tech(), four_series_result())
        .await
        .unwrap();
    sm.submit_result(order.order_id, &tech()).await.unwrap();
    sm.confirm(order.order_id, &physician()).await.unwrap()
}

/// Worker that does nothing on dispatch; the test plays the worker role by
/// calling the orchestrator's callback methods directly.
#[derive(Default)]
pub struct ManualWorker {
    pub dispatched: Mutex<Vec<JobDispatch>>,
    pub abandoned: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl InferenceWorker for ManualWorker {
    async fn dispatch(&self, dispatch: JobDispatch) {
        self.dispatched.lock().push(dispatch);
    }

    async fn abandon(&self, job_id: Uuid) {
        self.abandoned.lock().push(job_id);
    }
}

/// Archive stub keyed by study reference.
#[derive(Default)]
pub struct StubArchive {
    pub studies: HashMap<String, HashMap<String, Vec<Vec<u8>>>>,
}

impl StubArchive {
    pub fn with_study(study_ref: &str, channels: &[(&str, usize)]) -> Self {
        let mut map = HashMap::new();
        for (channel, count) in channels {
            map.insert(
                channel.to_string(),
                (0..*count).map(|i| vec![i as u8; 4]).collect(),
            );
        }
        let mut studies = HashMap::new();
        studies.insert(study_ref.to_string(), map);
        Self { studies }
    }
}

#[async_trait]
impl ArtifactArchive for StubArchive {
    async fn fetch_study(&self, study_ref: &str) -> Result<HashMap<String, Vec<Vec<u8>>>> {
        self.studies
            .get(study_ref)
            .cloned()
            .ok_or_else(|| clinflow_core::CoreError::UpstreamFetchFailed {
                category: "RIS".to_string(),
                detail: format!("unknown study {study_ref}"),
            })
    }
}

/// Compute stub returning a fixed summary and counting invocations.
#[derive(Default)]
pub struct StubCompute {
    pub runs: Mutex<usize>,
}

#[async_trait]
impl ModelCompute for StubCompute {
    async fn run(&self, input: &PreparedInput) -> Result<ComputeOutput> {
        *self.runs.lock() += 1;
        Ok(ComputeOutput {
            summary: json!({
                "model": input.model_code,
                "channels_seen": input.channels.len(),
                "tumor_volume_ml": 3.2,
            }),
            artifacts: vec![],
        })
    }
}

/// Poll until the job reaches a terminal state or the deadline passes.
pub async fn wait_for_terminal(system: &CoreSystem, job_id: Uuid) -> clinflow_core::models::inference::InferenceJob {
    for _ in 0..200 {
        if let Some(job) = system.jobs.snapshot(job_id).await {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_id} did not reach a terminal state in time");
}
