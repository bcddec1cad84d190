//! Active-mode relay: resolve a token for an identity, then push a
//! notification to the platform with it.
//!
//! A token is resolved by exactly one of two paths:
//!
//! - **saved token**: `use_saved_token` plus `notify_id`. The token must
//!   already be cached; this path never falls back to an exchange.
//! - **exchange**: `notify_code`. The code is parsed, and its identity is
//!   looked up in the cache first. Only on a miss is the code exchanged with
//!   the platform, under the identity's exchange lock, and the new token
//!   cached.
//!
//! Each call makes at most one exchange and one submit attempt. Upstream
//! failures are returned tagged with the step that failed and are never
//! retried or reinterpreted; a rejected submit does not evict the cached
//! token.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use relay_platform::{ExchangeResult, PlatformClient, PlatformError, SubmitResult};
use relay_store::TokenCache;
use relay_types::{
    non_blank, CachedToken, FormatError, IdentityCode, Metadata, NotificationType,
    OutboundNotification, Priority, SourceDescriptor,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed relay settings.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// This application's public base URL.
    pub public_url: String,
    /// Source name used when the caller does not supply one.
    pub source_name: String,
}

/// A caller's request to push a notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub priority: Option<String>,
    /// Display name of the sender; also presented to the platform on exchange.
    pub source: Option<String>,
    pub metadata: Option<Metadata>,
    pub callback_url: Option<String>,
    pub external_id: Option<String>,
    /// Identification code to exchange.
    pub notify_code: Option<String>,
    /// Use the token cached for `notify_id` instead of exchanging a code.
    #[serde(default)]
    pub use_saved_token: bool,
    pub notify_id: Option<String>,
}

/// Which platform call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStep {
    Exchange,
    Submit,
}

impl RelayStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exchange => "exchange",
            Self::Submit => "submit",
        }
    }
}

impl fmt::Display for RelayStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by [`Relay::send_notification`].
#[derive(Debug, Error)]
pub enum RelayError {
    /// Required request fields are missing or empty.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// The request is otherwise unusable.
    #[error("{0}")]
    Validation(String),

    /// The identification code is malformed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// No token is cached for the requested identity.
    #[error("no saved token for identity {0}")]
    NotFound(String),

    /// The platform rejected the call or could not be reached.
    #[error("{step} failed: {source}")]
    Upstream {
        step: RelayStep,
        #[source]
        source: PlatformError,
    },
}

/// The result of a successful relay.
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    /// Identity the notification was sent for.
    pub identity: String,
    /// Whether the caller asked for the saved-token path.
    pub used_saved_token: bool,
    /// Present only when this call performed an exchange.
    pub exchange_result: Option<ExchangeResult>,
    pub submit_result: SubmitResult,
}

/// Use-case layer tying the token cache and the platform client together.
#[derive(Debug)]
pub struct Relay {
    tokens: Arc<TokenCache>,
    platform: PlatformClient,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(tokens: Arc<TokenCache>, platform: PlatformClient, settings: RelaySettings) -> Self {
        Self {
            tokens,
            platform,
            settings,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    /// Resolves a token and submits the notification.
    ///
    /// # Errors
    ///
    /// See [`RelayError`]. Platform failures carry the step that failed.
    pub async fn send_notification(&self, request: SendRequest) -> Result<RelayOutcome, RelayError> {
        let missing: Vec<&'static str> = [
            ("title", request.title.as_deref()),
            ("content", request.content.as_deref()),
        ]
        .into_iter()
        .filter(|(_, value)| value.map_or(true, str::is_empty))
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(RelayError::MissingFields(missing));
        }

        let source_name = non_blank(request.source.as_deref())
            .unwrap_or_else(|| self.settings.source_name.clone());

        let saved_identity = non_blank(request.notify_id.as_deref())
            .filter(|_| request.use_saved_token);
        let code = request
            .notify_code
            .as_deref()
            .filter(|c| !c.is_empty());

        let (identity, token, exchange_result, used_saved_token) = match (saved_identity, code) {
            (Some(identity), _) => {
                let cached = self
                    .tokens
                    .get(&identity)
                    .ok_or_else(|| RelayError::NotFound(identity.clone()))?;
                tracing::info!(identity = %identity, "using saved token");
                (identity, cached.token.clone(), None, true)
            }
            (None, Some(raw)) => {
                let code = IdentityCode::parse(raw)?;
                let (token, exchange) = self.resolve_token(&code, &source_name).await?;
                (code.identity().to_string(), token, exchange, false)
            }
            (None, None) => {
                return Err(RelayError::Validation(
                    "must supply notify_code or a saved token (use_saved_token + notify_id)"
                        .to_string(),
                ))
            }
        };

        let notification = OutboundNotification {
            identity: identity.clone(),
            token,
            title: request.title.unwrap_or_default(),
            content: request.content.unwrap_or_default(),
            kind: request
                .kind
                .unwrap_or_else(|| NotificationType::default().as_str().to_string()),
            priority: request
                .priority
                .unwrap_or_else(|| Priority::default().as_str().to_string()),
            source: SourceDescriptor {
                name: source_name,
                url: self.settings.public_url.clone(),
                icon: None,
            },
            metadata: request.metadata.unwrap_or_default(),
            callback_url: non_blank(request.callback_url.as_deref()),
            external_id: non_blank(request.external_id.as_deref()),
        };

        let submit_result = self
            .platform
            .submit(&notification)
            .await
            .map_err(|source| RelayError::Upstream {
                step: RelayStep::Submit,
                source,
            })?;

        tracing::info!(
            identity = %identity,
            platform_id = submit_result.platform_id.as_deref().unwrap_or("-"),
            exchanged = exchange_result.is_some(),
            "notification relayed"
        );

        Ok(RelayOutcome {
            identity,
            used_saved_token,
            exchange_result,
            submit_result,
        })
    }

    /// Returns the cached token for the code's identity, exchanging the code
    /// on a miss.
    ///
    /// A cached token wins even if `code` carries a different secret.
    async fn resolve_token(
        &self,
        code: &IdentityCode,
        issuer_name: &str,
    ) -> Result<(String, Option<ExchangeResult>), RelayError> {
        let identity = code.identity();
        if let Some(cached) = self.tokens.get(identity) {
            tracing::info!(identity, "reusing cached token for code");
            return Ok((cached.token.clone(), None));
        }

        let lock = self.tokens.exchange_lock(identity);
        let _guard = lock.lock().await;

        // Another request may have completed the exchange while we waited.
        if let Some(cached) = self.tokens.get(identity) {
            tracing::debug!(identity, "token cached by concurrent exchange");
            return Ok((cached.token.clone(), None));
        }

        tracing::info!(identity, "exchanging identification code");
        let result = self
            .platform
            .exchange(code.source_code(), issuer_name, &self.settings.public_url)
            .await
            .map_err(|source| RelayError::Upstream {
                step: RelayStep::Exchange,
                source,
            })?;

        self.tokens.put(CachedToken {
            identity: identity.to_string(),
            source_code: code.source_code().to_string(),
            token: result.token.clone(),
            issuer_name: issuer_name.to_string(),
            created_at: Utc::now(),
            subscription_info: Some(result.subscription_info.clone()),
        });

        Ok((result.token.clone(), Some(result)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_platform::PlatformConfig;

    /// A relay whose platform is never reachable; only paths that fail
    /// before any network call are exercised here.
    fn offline_relay() -> Relay {
        let platform = PlatformClient::new(PlatformConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: std::time::Duration::from_millis(200),
        })
        .unwrap();
        Relay::new(
            Arc::new(TokenCache::new()),
            platform,
            RelaySettings {
                public_url: "http://localhost:5000".to_string(),
                source_name: "demo".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn empty_title_is_named() {
        let err = offline_relay()
            .send_notification(SendRequest {
                title: Some(String::new()),
                content: Some("x".to_string()),
                notify_code: Some("notify:user:a:b".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            RelayError::MissingFields(fields) => assert_eq!(fields, vec!["title"]),
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn every_missing_field_is_listed() {
        let err = offline_relay()
            .send_notification(SendRequest::default())
            .await
            .unwrap_err();
        match err {
            RelayError::MissingFields(fields) => assert_eq!(fields, vec!["title", "content"]),
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn neither_code_nor_saved_token_is_rejected() {
        let err = offline_relay()
            .send_notification(SendRequest {
                title: Some("t".to_string()),
                content: Some("c".to_string()),
                notify_id: Some("abcd".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_code_is_format_error() {
        let err = offline_relay()
            .send_notification(SendRequest {
                title: Some("t".to_string()),
                content: Some("c".to_string()),
                notify_code: Some("notify:user:only-three".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, RelayError::Format(FormatError::SegmentCount(3))),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn saved_token_path_never_exchanges() {
        // A valid code is present too, but the saved-token path wins and
        // must fail without touching the platform.
        let err = offline_relay()
            .send_notification(SendRequest {
                title: Some("t".to_string()),
                content: Some("c".to_string()),
                use_saved_token: true,
                notify_id: Some("unknown".to_string()),
                notify_code: Some("notify:user:unknown:S".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            RelayError::NotFound(identity) => assert_eq!(identity, "unknown"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn upstream_error_names_step() {
        let err = RelayError::Upstream {
            step: RelayStep::Exchange,
            source: PlatformError::MissingToken,
        };
        assert!(err.to_string().starts_with("exchange failed"));
    }
}
