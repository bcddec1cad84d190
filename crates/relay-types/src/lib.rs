//! Shared types for the notification relay.
//!
//! This crate holds the data model that flows between the stores, the
//! platform client, and the HTTP server: identification codes, cached access
//! tokens, outbound notifications in their platform wire shape, and the
//! notifications kept for passive-mode polling.
//!
//! Notification type and priority are open strings. The platform validates
//! them; the relay only supplies defaults and passes caller values through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod code;
pub use code::{FormatError, IdentityCode, CODE_PREFIX};

/// Opaque, order-preserving JSON object carried as notification metadata.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Number of characters of a token shown in previews.
const TOKEN_PREVIEW_CHARS: usize = 20;

/// Notification kinds understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

/// Delivery priorities understood by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// An access token obtained from the platform for one identity.
///
/// Entries are immutable: a fresh exchange replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    /// Identity segment of the code the token was issued for.
    #[serde(rename = "notify_id")]
    pub identity: String,
    /// The full identification code that was exchanged.
    #[serde(rename = "notify_code")]
    pub source_code: String,
    /// The access token.
    pub token: String,
    /// Name this application presented to the platform during exchange.
    #[serde(rename = "third_party_name")]
    pub issuer_name: String,
    /// When the exchange succeeded.
    pub created_at: DateTime<Utc>,
    /// The platform's full exchange response.
    #[serde(default)]
    pub subscription_info: Option<serde_json::Value>,
}

impl CachedToken {
    /// The first 20 characters of the token followed by `...`.
    pub fn token_preview(&self) -> String {
        let head: String = self.token.chars().take(TOKEN_PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}

/// Identifies the sending application inside an outbound notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    /// Always serialized; `null` when unset.
    pub icon: Option<String>,
}

/// A notification in the platform's `/api/notifications/receive` wire shape.
///
/// `callbackUrl` and `externalId` are omitted from the payload when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundNotification {
    #[serde(rename = "notifyId")]
    pub identity: String,
    pub token: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: String,
    pub source: SourceDescriptor,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(
        rename = "callbackUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub callback_url: Option<String>,
    #[serde(
        rename = "externalId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub external_id: Option<String>,
}

/// A notification held locally for passive-mode polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNotification {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    /// Serialized as `null` when absent.
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Returns the trimmed value if it contains anything besides whitespace.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
