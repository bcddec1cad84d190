use std::time::{Duration, Instant};

use relay_types::OutboundNotification;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PlatformError, Rejection};

/// Path of the platform's code verification endpoint.
pub const VERIFY_PATH: &str = "/api/subscriptions/active/verify";

/// Path of the platform's notification intake endpoint.
pub const RECEIVE_PATH: &str = "/api/notifications/receive";

/// Fixed timeout applied to every platform request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the platform.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Base URL of the platform, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "notifyCode")]
    notify_code: &'a str,
    #[serde(rename = "thirdPartyName")]
    third_party_name: &'a str,
    #[serde(rename = "thirdPartyUrl")]
    third_party_url: &'a str,
}

/// A successful code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeResult {
    /// The issued access token.
    pub token: String,
    /// Identity the platform bound the token to, if reported.
    pub identity: Option<String>,
    /// Subscription id reported by the platform, if any.
    pub subscription_id: Option<String>,
    /// The platform's full response body.
    pub subscription_info: Value,
}

/// A notification accepted by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResult {
    /// Status the platform answered with (200 for duplicates, 201 for new).
    pub status: u16,
    /// Id the platform assigned to the notification, if reported.
    pub platform_id: Option<String>,
    /// The platform's full response body.
    pub body: Value,
}

/// HTTP client for the two platform operations.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
}

impl PlatformClient {
    /// Builds a client for the platform at `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Client`] if the underlying HTTP client cannot
    /// be built (e.g. the TLS backend fails to initialise).
    pub fn new(config: PlatformConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("notify-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PlatformError::Client)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchanges an identification code for an access token.
    ///
    /// `code` is sent exactly as the caller supplied it.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Rejected`] on a non-2xx answer
    /// - [`PlatformError::MissingToken`] if a 2xx answer has no `token`
    /// - [`PlatformError::Transport`] if the platform is unreachable
    pub async fn exchange(
        &self,
        code: &str,
        caller_name: &str,
        caller_url: &str,
    ) -> Result<ExchangeResult, PlatformError> {
        let request = VerifyRequest {
            notify_code: code,
            third_party_name: caller_name,
            third_party_url: caller_url,
        };
        let (_, body) = self.post_json(VERIFY_PATH, &request).await?;

        let token = body
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(PlatformError::MissingToken)?
            .to_string();
        let identity = body.get("identity").and_then(value_as_id);
        let subscription_id = body
            .pointer("/subscription/id")
            .and_then(value_as_id);

        Ok(ExchangeResult {
            token,
            identity,
            subscription_id,
            subscription_info: body,
        })
    }

    /// Submits a notification to the platform.
    ///
    /// The identity and token travel inside the body, not as headers.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Rejected`] on a non-2xx answer
    /// - [`PlatformError::Transport`] if the platform is unreachable
    pub async fn submit(
        &self,
        notification: &OutboundNotification,
    ) -> Result<SubmitResult, PlatformError> {
        let (status, body) = self.post_json(RECEIVE_PATH, notification).await?;
        let platform_id = body
            .get("notificationId")
            .or_else(|| body.get("id"))
            .and_then(value_as_id);

        Ok(SubmitResult {
            status,
            platform_id,
            body,
        })
    }

    /// POSTs `payload` as JSON and classifies the answer.
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<(u16, Value), PlatformError> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %url, error = %e, "platform unreachable");
                PlatformError::Transport(e)
            })?;

        let status = response.status().as_u16();
        let success = response.status().is_success();
        let text = response.text().await.map_err(|e| {
            tracing::error!(url = %url, status, error = %e, "failed to read platform response");
            PlatformError::Transport(e)
        })?;

        tracing::info!(
            url = %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "platform call finished"
        );

        if !success {
            let rejection = Rejection::from_body(status, &text);
            tracing::warn!(
                url = %url,
                status,
                code = rejection.code.as_deref().unwrap_or("-"),
                message = %rejection.message,
                "platform rejected request"
            );
            return Err(PlatformError::Rejected(rejection));
        }

        if text.trim().is_empty() {
            return Ok((status, Value::Object(Default::default())));
        }

        serde_json::from_str(&text)
            .map(|body| (status, body))
            .map_err(|e| PlatformError::MalformedResponse {
                status,
                reason: e.to_string(),
            })
    }
}

/// Platform ids may be strings or numbers.
fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
