//! HTTP boundary tests driven through the router with `tower::oneshot`.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use clinflow_core::state_machine::states::JobState;
use clinflow_core::system::CoreSystem;

use common::{confirmed_ris_order, test_system, ManualWorker};

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_order_body(patient: &str) -> Value {
    json!({
        "requester": {"id": "dr-kim", "role": "physician"},
        "patient_id": patient,
        "category": "RIS",
        "work_type": "MRI_BRAIN",
        "request_payload": {"region": "brain"},
    })
}

fn worker_body() -> Value {
    json!({"actor": {"id": "tech-lee", "role": "worker"}})
}

fn web_system() -> CoreSystem {
    let system = test_system();
    system.attach_worker(Arc::new(ManualWorker::default()));
    system
}

#[tokio::test]
async fn order_creation_returns_201_with_the_new_order() {
    let system = web_system();
    let response = system
        .router()
        .oneshot(post("/v1/orders", create_order_body("patient-1")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ordered");
    assert_eq!(body["patient_id"], "patient-1");
    assert!(body["order_id"].as_str().unwrap().parse::<Uuid>().is_ok());
}

#[tokio::test]
async fn illegal_transition_maps_to_409_with_detail() {
    let system = web_system();
    let created = system
        .router()
        .oneshot(post("/v1/orders", create_order_body("patient-1")))
        .await
        .unwrap();
    let order: Value = json_body(created).await;
    let order_id = order["order_id"].as_str().unwrap();

    // Start before accept.
    let response = system
        .router()
        .oneshot(post(&format!("/v1/orders/{order_id}/start"), worker_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"], "illegal_transition");
    assert_eq!(body["detail"]["current_state"], "ordered");
    assert_eq!(body["detail"]["attempted"], "start");
}

#[tokio::test]
async fn foreign_actor_maps_to_403() {
    let system = web_system();
    let created = system
        .router()
        .oneshot(post("/v1/orders", create_order_body("patient-1")))
        .await
        .unwrap();
    let order: Value = json_body(created).await;
    let order_id = order["order_id"].as_str().unwrap();

    system
        .router()
        .oneshot(post(&format!("/v1/orders/{order_id}/accept"), worker_body()))
        .await
        .unwrap();

    let response = system
        .router()
        .oneshot(post(
            &format!("/v1/orders/{order_id}/start"),
            json!({"actor": {"id": "tech-park", "role": "worker"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn job_submission_without_inputs_maps_to_422_with_missing_keys() {
    let system = web_system();
    let response = system
        .router()
        .oneshot(post(
            "/v1/jobs",
            json!({
                "model_code": "M1",
                "patient_id": "patient-1",
                "actor": {"id": "dr-kim", "role": "physician"},
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "input_not_ready");
    assert_eq!(body["detail"]["missing_keys"]["RIS"][0], "dicom.T1");
}

#[tokio::test]
async fn job_flow_over_http_submit_callback_and_poll() {
    let system = web_system();
    confirmed_ris_order(&system, "patient-1").await;

    let submitted = system
        .router()
        .oneshot(post(
            "/v1/jobs",
            json!({
                "model_code": "M1",
                "patient_id": "patient-1",
                "actor": {"id": "dr-kim", "role": "physician"},
            }),
        ))
        .await
        .unwrap();
    assert_eq!(submitted.status(), StatusCode::CREATED);
    let job: Value = json_body(submitted).await;
    let job_id = job["job_id"].as_str().unwrap().to_string();
    assert_eq!(job["status"], "pending");

    let progressed = system
        .router()
        .oneshot(post(
            &format!("/v1/jobs/{job_id}/progress"),
            json!({"percent": 50, "status_text": "running inference"}),
        ))
        .await
        .unwrap();
    assert_eq!(progressed.status(), StatusCode::OK);

    let called_back = system
        .router()
        .oneshot(post(
            &format!("/v1/jobs/{job_id}/callback"),
            json!({"status": "completed", "result_summary": {"volume_ml": 3.2}}),
        ))
        .await
        .unwrap();
    assert_eq!(called_back.status(), StatusCode::OK);

    let polled = system
        .router()
        .oneshot(get(&format!("/v1/jobs/{job_id}")))
        .await
        .unwrap();
    assert_eq!(polled.status(), StatusCode::OK);
    let view = json_body(polled).await;
    assert_eq!(view["status"], "completed");
    assert_eq!(view["progress_percent"], 100);
}

#[tokio::test]
async fn redelivered_terminal_callback_returns_200_and_keeps_the_first() {
    let system = web_system();
    confirmed_ris_order(&system, "patient-1").await;
    let job = system
        .orchestrator
        .submit("M1", "patient-1", &common::physician(), None)
        .await
        .unwrap();
    let job_id = job.job_id;
    system
        .orchestrator
        .report_progress(job_id, 95, "packaging result")
        .await
        .unwrap();

    let first = system
        .router()
        .oneshot(post(
            &format!("/v1/jobs/{job_id}/callback"),
            json!({"status": "completed", "result_summary": {"run": 1}}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = system
        .router()
        .oneshot(post(
            &format!("/v1/jobs/{job_id}/callback"),
            json!({"status": "failed", "error_detail": {"kind": "worker_error", "message": "retry"}}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let stored = system.jobs.snapshot(job_id).await.unwrap();
    assert_eq!(stored.status, JobState::Completed);
    assert_eq!(stored.result_summary, Some(json!({"run": 1})));
}

#[tokio::test]
async fn completed_callback_on_a_pending_job_is_a_409() {
    let system = web_system();
    confirmed_ris_order(&system, "patient-1").await;
    let job = system
        .orchestrator
        .submit("M1", "patient-1", &common::physician(), None)
        .await
        .unwrap();

    let response = system
        .router()
        .oneshot(post(
            &format!("/v1/jobs/{}/callback", job.job_id),
            json!({"status": "completed", "result_summary": {"ok": true}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"], "illegal_job_transition");
    assert_eq!(body["detail"]["current_state"], "pending");
    assert_eq!(body["detail"]["attempted"], "complete");
}

#[tokio::test]
async fn completed_callback_without_summary_is_a_400() {
    let system = web_system();
    let response = system
        .router()
        .oneshot(post(
            &format!("/v1/jobs/{}/callback", Uuid::new_v4()),
            json!({"status": "completed"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn unknown_job_polls_as_404() {
    let system = web_system();
    let response = system
        .router()
        .oneshot(get(&format!("/v1/jobs/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "not_found");
}
