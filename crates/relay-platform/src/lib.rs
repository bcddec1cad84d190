//! Client for the notification platform.
//!
//! Wraps the two remote operations the relay needs:
//!
//! - `POST /api/subscriptions/active/verify`: trade an identification code
//!   for an access token ([`PlatformClient::exchange`])
//! - `POST /api/notifications/receive`: deliver a notification
//!   ([`PlatformClient::submit`])
//!
//! Every answer is classified into a typed outcome. Non-2xx answers become
//! [`PlatformError::Rejected`] with the platform's status, code, message and
//! details preserved; failures to reach the platform at all become
//! [`PlatformError::Transport`]. Nothing is retried.

pub mod client;
pub mod error;

pub use client::{
    ExchangeResult, PlatformClient, PlatformConfig, SubmitResult, DEFAULT_TIMEOUT, RECEIVE_PATH,
    VERIFY_PATH,
};
pub use error::{PlatformError, Rejection};
