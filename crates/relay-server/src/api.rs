//! Passive-mode and notification management handlers.

use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use relay_store::StoreError;
use relay_types::{non_blank, Metadata, NotificationType, Priority, StoredNotification};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Number of notifications returned by a poll that sets no `limit`.
pub const DEFAULT_POLL_LIMIT: usize = 10;

/// Source label for notifications created without one.
const DEFAULT_ADMIN_SOURCE: &str = "admin";

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StoreError::DuplicateId(_) => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Query parameters for the passive poll.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Only return notifications newer than this ISO 8601 timestamp.
    pub since: Option<String>,
    /// Maximum number of notifications to return.
    pub limit: Option<usize>,
}

/// Response body for the passive poll.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub notifications: Vec<StoredNotification>,
}

/// Request body for creating a notification.
#[derive(Debug, Default, Deserialize)]
pub struct CreateNotificationRequest {
    /// Fixed id; generated when absent.
    pub id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub source: Option<String>,
    pub callback_url: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Handler for `GET /api/notifications`.
///
/// Polled by the platform. An unparsable `since` is ignored.
pub async fn list_notifications_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<ListResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_POLL_LIMIT);
    let notifications = state.notifications.list(query.since.as_deref(), limit);
    tracing::info!(
        count = notifications.len(),
        since = query.since.as_deref().unwrap_or("-"),
        limit,
        "passive poll served"
    );
    Json(ListResponse { notifications })
}

/// Handler for `GET /api/notifications/{id}`.
pub async fn get_notification_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let notification = state.notifications.get(&id)?;
    Ok(Json(json!({
        "success": true,
        "notification": notification
    })))
}

/// Handler for `POST /admin/create-notification`.
pub async fn create_notification_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<CreateNotificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(payload) = payload?;
    let id = match payload.id {
        Some(id) if id.trim().is_empty() => {
            return Err(ApiError::BadRequest("id must not be blank".to_string()))
        }
        Some(id) => id,
        None => uuid::Uuid::new_v4().to_string(),
    };

    let notification = StoredNotification {
        id,
        title: payload.title.unwrap_or_default(),
        content: payload.content.unwrap_or_default(),
        kind: payload
            .kind
            .unwrap_or_else(|| NotificationType::default().as_str().to_string()),
        priority: payload
            .priority
            .unwrap_or_else(|| Priority::default().as_str().to_string()),
        timestamp: Utc::now(),
        source: non_blank(payload.source.as_deref())
            .unwrap_or_else(|| DEFAULT_ADMIN_SOURCE.to_string()),
        callback_url: non_blank(payload.callback_url.as_deref()),
        metadata: payload.metadata.unwrap_or_default(),
    };

    state.notifications.append(notification.clone())?;
    tracing::info!(id = %notification.id, title = %notification.title, "created notification");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "notification": notification
        })),
    ))
}

/// Handler for `POST /admin/clear-notifications`.
pub async fn clear_notifications_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<Value> {
    let cleared = state.notifications.clear();
    tracing::info!(cleared, "cleared notifications");
    Json(json!({
        "success": true,
        "cleared": cleared,
        "message": format!("cleared {cleared} notifications")
    }))
}
