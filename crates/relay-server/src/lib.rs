//! Notification relay server library logic.

pub mod api;
pub mod api_relay;
pub mod api_tokens;
pub mod config;
pub mod relay;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use relay_platform::{PlatformClient, PlatformError};
use relay_store::{NotificationStore, TokenCache};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::relay::{Relay, RelaySettings};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Active-mode relay.
    pub relay: Arc<Relay>,
    /// Cached access tokens. Shared with `relay`.
    pub tokens: Arc<TokenCache>,
    /// Notifications served to the platform in passive mode.
    pub notifications: Arc<NotificationStore>,
}

impl AppState {
    /// Builds fresh, empty state for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Client`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, PlatformError> {
        let tokens = Arc::new(TokenCache::new());
        let platform = PlatformClient::new(config.platform.client_config())?;
        let relay = Relay::new(
            tokens.clone(),
            platform,
            RelaySettings {
                public_url: config.server.public_url.clone(),
                source_name: config.relay.source_name.clone(),
            },
        );
        Ok(Self {
            relay: Arc::new(relay),
            tokens,
            notifications: Arc::new(NotificationStore::new()),
        })
    }
}

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "notifications_count": state.notifications.len(),
        "tokens_count": state.tokens.len(),
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Passive mode: polled by the platform.
        .route("/api/notifications", get(api::list_notifications_handler))
        .route(
            "/api/notifications/{id}",
            get(api::get_notification_handler),
        )
        // Active mode.
        .route(
            "/api/send-notification",
            post(api_relay::send_notification_handler),
        )
        .route("/api/tokens", get(api_tokens::list_tokens_handler))
        .route("/api/tokens/clear", post(api_tokens::clear_tokens_handler))
        .route(
            "/api/tokens/{notifyId}",
            delete(api_tokens::delete_token_handler),
        )
        // Bulletin board management.
        .route(
            "/admin/create-notification",
            post(api::create_notification_handler),
        )
        .route(
            "/admin/clear-notifications",
            post(api::clear_notifications_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
