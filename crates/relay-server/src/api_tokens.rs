//! Cached token management handlers.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::{Extension, Json, Path};
use relay_types::CachedToken;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// A cached token as listed by `GET /api/tokens`.
#[derive(Debug, Serialize)]
pub struct TokenView<'a> {
    #[serde(flatten)]
    pub token: &'a CachedToken,
    pub token_preview: String,
}

/// Handler for `GET /api/tokens`.
pub async fn list_tokens_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let tokens = state.tokens.list();
    let views: Vec<TokenView<'_>> = tokens
        .iter()
        .map(|token| TokenView {
            token: token.as_ref(),
            token_preview: token.token_preview(),
        })
        .collect();

    Json(json!({
        "success": true,
        "count": views.len(),
        "tokens": views,
    }))
}

/// Handler for `DELETE /api/tokens/{notifyId}`.
pub async fn delete_token_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(notify_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.tokens.delete(&notify_id) {
        return Err(ApiError::NotFound(format!("no saved token for {notify_id}")));
    }
    tracing::info!(identity = %notify_id, "deleted saved token");
    Ok(Json(json!({
        "success": true,
        "message": format!("token {notify_id} deleted")
    })))
}

/// Handler for `POST /api/tokens/clear`.
pub async fn clear_tokens_handler(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let cleared = state.tokens.clear();
    tracing::info!(cleared, "cleared saved tokens");
    Json(json!({
        "success": true,
        "cleared": cleared,
        "message": format!("cleared {cleared} saved tokens")
    }))
}
