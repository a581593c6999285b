//! Web boundary: order API, job submission and polling, and the worker
//! callback endpoint.

pub mod errors;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;

pub use errors::{ApiError, ApiResult};
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/orders", post(handlers::orders::create))
        .route("/v1/orders/:order_id", get(handlers::orders::get))
        .route("/v1/orders/:order_id/accept", post(handlers::orders::accept))
        .route("/v1/orders/:order_id/start", post(handlers::orders::start))
        .route(
            "/v1/orders/:order_id/result",
            post(handlers::orders::save_result),
        )
        .route(
            "/v1/orders/:order_id/submit",
            post(handlers::orders::submit_result),
        )
        .route(
            "/v1/orders/:order_id/confirm",
            post(handlers::orders::confirm),
        )
        .route("/v1/orders/:order_id/cancel", post(handlers::orders::cancel))
        .route("/v1/jobs", post(handlers::jobs::submit))
        .route("/v1/jobs/:job_id", get(handlers::jobs::status))
        .route("/v1/jobs/:job_id/callback", post(handlers::jobs::callback))
        .route("/v1/jobs/:job_id/progress", post(handlers::jobs::progress))
        .route("/v1/jobs/:job_id/cancel", post(handlers::jobs::cancel))
        .with_state(state)
}
