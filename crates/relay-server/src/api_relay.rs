//! Active-mode send endpoint.

use crate::relay::{RelayError, SendRequest};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};
use std::sync::Arc;

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RelayError::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": self.to_string(),
                    "missing_fields": fields,
                }),
            ),
            RelayError::Validation(_) | RelayError::Format(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": self.to_string() }),
            ),
            RelayError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": self.to_string() }),
            ),
            RelayError::Upstream { step, source } => {
                // Upstream statuses are passed through as-is; anything that is
                // not a valid HTTP status is reported as a bad gateway.
                let status =
                    StatusCode::from_u16(source.status()).unwrap_or(StatusCode::BAD_GATEWAY);
                let mut body = json!({
                    "success": false,
                    "error": source.message(),
                    "step": step,
                    "status_code": source.status(),
                });
                if let Some(code) = source.code() {
                    body["error_code"] = json!(code);
                }
                if let Some(details) = source.details() {
                    body["error_details"] = details.clone();
                }
                (status, body)
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Handler for `POST /api/send-notification`.
///
/// A body that is not valid JSON for [`SendRequest`] is a validation error.
pub async fn send_notification_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<Value>, RelayError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "rejected send-notification body");
        RelayError::Validation(rejection.body_text())
    })?;

    let outcome = state
        .relay
        .send_notification(payload)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "send-notification failed");
            e
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "notification delivered to the platform",
        "verify_result": outcome.exchange_result.map(|r| r.subscription_info),
        "send_result": outcome.submit_result.body,
        "platform_id": outcome.submit_result.platform_id,
        "notify_id": outcome.identity,
        "used_saved_token": outcome.used_saved_token,
    })))
}
