use serde_json::Value;
use thiserror::Error;

/// A non-2xx answer from the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// HTTP status the platform answered with.
    pub status: u16,
    /// The platform's `error` message, or `"<status> - <body>"` when the
    /// body was not a JSON object.
    pub message: String,
    /// The platform's `code`, when the body was structured.
    pub code: Option<String>,
    /// The platform's `details`, when the body was structured.
    pub details: Option<Value>,
}

impl Rejection {
    /// Classifies an error response body.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(obj)) => Self {
                status,
                message: obj
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
                code: Some(
                    obj.get("code")
                        .and_then(Value::as_str)
                        .unwrap_or("UNKNOWN_ERROR")
                        .to_string(),
                ),
                details: Some(
                    obj.get("details")
                        .cloned()
                        .unwrap_or_else(|| Value::Object(Default::default())),
                ),
            },
            _ => Self {
                status,
                message: format!("{status} - {body}"),
                code: None,
                details: None,
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform answered with a non-2xx status.
    #[error("platform rejected request ({}): {}", .0.status, .0.message)]
    Rejected(Rejection),

    /// A successful verification response carried no token.
    #[error("platform accepted the code but returned no token")]
    MissingToken,

    /// A successful response body could not be read as JSON.
    #[error("platform returned an unreadable response ({status}): {reason}")]
    MalformedResponse { status: u16, reason: String },

    /// The platform could not be reached (connect failure, timeout, ...).
    #[error("could not reach platform: {0}")]
    Transport(#[source] reqwest::Error),

    /// The HTTP client could not be constructed.
    #[error("failed to build platform HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl PlatformError {
    /// HTTP status to surface to the relay's caller.
    ///
    /// Rejections keep the platform's own status; transport failures are
    /// `503 Service Unavailable`.
    pub fn status(&self) -> u16 {
        match self {
            Self::Rejected(rejection) => rejection.status,
            Self::MissingToken | Self::Client(_) => 500,
            Self::MalformedResponse { .. } => 502,
            Self::Transport(_) => 503,
        }
    }

    /// Whether the platform was unreachable, as opposed to having answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The platform's error code, if it sent a structured rejection.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected(rejection) => rejection.code.as_deref(),
            Self::MissingToken => Some("missing-token"),
            _ => None,
        }
    }

    /// The platform's error details, if it sent a structured rejection.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Rejected(rejection) => rejection.details.as_ref(),
            _ => None,
        }
    }

    /// Caller-facing message: the platform's own message for rejections.
    pub fn message(&self) -> String {
        match self {
            Self::Rejected(rejection) => rejection.message.clone(),
            other => other.to_string(),
        }
    }
}
