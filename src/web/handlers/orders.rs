//! Order creation and transition endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::actor::Actor;
use crate::models::order::Order;
use crate::state_machine::order_state_machine::CreateOrderRequest;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActorContext {
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub struct SaveResultRequest {
    pub actor: Actor,
    pub result: Value,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub actor: Actor,
    pub reason: String,
}

/// POST /v1/orders
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state.state_machine.create(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /v1/orders/:order_id
pub async fn get(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    let order = state
        .state_machine
        .store()
        .snapshot(order_id)
        .await
        .ok_or_else(|| ApiError::from(crate::error::CoreError::not_found(format!("order {order_id}"))))?;
    Ok(Json(order))
}

/// POST /v1/orders/:order_id/accept
pub async fn accept(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<ActorContext>,
) -> ApiResult<Json<Order>> {
    let order = state.state_machine.accept(order_id, &body.actor).await?;
    Ok(Json(order))
}

/// POST /v1/orders/:order_id/start
pub async fn start(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<ActorContext>,
) -> ApiResult<Json<Order>> {
    let order = state.state_machine.start(order_id, &body.actor).await?;
    Ok(Json(order))
}

/// POST /v1/orders/:order_id/result (draft save, no status change)
pub async fn save_result(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<SaveResultRequest>,
) -> ApiResult<Json<Order>> {
    let order = state
        .state_machine
        .save_result(order_id, &body.actor, body.result)
        .await?;
    Ok(Json(order))
}

/// POST /v1/orders/:order_id/submit
pub async fn submit_result(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<ActorContext>,
) -> ApiResult<Json<Order>> {
    let order = state
        .state_machine
        .submit_result(order_id, &body.actor)
        .await?;
    Ok(Json(order))
}

/// POST /v1/orders/:order_id/confirm
pub async fn confirm(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<ActorContext>,
) -> ApiResult<Json<Order>> {
    let order = state.state_machine.confirm(order_id, &body.actor).await?;
    Ok(Json(order))
}

/// POST /v1/orders/:order_id/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<CancelRequest>,
) -> ApiResult<Json<Order>> {
    let order = state
        .state_machine
        .cancel(order_id, &body.actor, &body.reason)
        .await?;
    Ok(Json(order))
}
