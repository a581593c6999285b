//! Mapping of the core error taxonomy onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::CoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub detail: Option<serde_json::Value>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
            detail: None,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let (status, code, detail) = match &err {
            CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error", None),
            CoreError::IllegalTransition { from, attempted } => (
                StatusCode::CONFLICT,
                "illegal_transition",
                Some(json!({"current_state": from, "attempted": attempted})),
            ),
            CoreError::IllegalJobTransition { from, attempted } => (
                StatusCode::CONFLICT,
                "illegal_job_transition",
                Some(json!({"current_state": from, "attempted": attempted})),
            ),
            CoreError::Forbidden { .. } => (StatusCode::FORBIDDEN, "forbidden", None),
            CoreError::InputNotReady { missing } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "input_not_ready",
                Some(json!({"missing_keys": missing})),
            ),
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            CoreError::UpstreamFetchFailed { category, .. } => (
                StatusCode::BAD_GATEWAY,
                "upstream_fetch_failed",
                Some(json!({"category": category})),
            ),
            CoreError::CallbackDeliveryFailed(_) => {
                (StatusCode::BAD_GATEWAY, "callback_delivery_failed", None)
            }
            CoreError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout", None),
            CoreError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.code,
            "message": self.message,
        });
        if let Some(detail) = self.detail {
            body["detail"] = detail;
        }
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::states::OrderState;

    #[test]
    fn illegal_transition_maps_to_conflict_with_states() {
        let api: ApiError =
            CoreError::illegal_transition(OrderState::Confirmed, "save_result").into();
        assert_eq!(api.status, StatusCode::CONFLICT);
        let detail = api.detail.unwrap();
        assert_eq!(detail["current_state"], "confirmed");
        assert_eq!(detail["attempted"], "save_result");
    }

    #[test]
    fn input_not_ready_enumerates_missing_keys() {
        let mut missing = std::collections::BTreeMap::new();
        missing.insert("RIS".to_string(), vec!["dicom.T1".to_string()]);
        let api: ApiError = CoreError::InputNotReady { missing }.into();
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.detail.unwrap()["missing_keys"]["RIS"][0], "dicom.T1");
    }
}
