//! Volatile, process-lifetime stores for the notification relay.
//!
//! Two stores live here:
//!
//! - [`TokenCache`]: access tokens keyed by identity, plus the per-identity
//!   locks that keep at most one exchange in flight for an identity.
//! - [`NotificationStore`]: the append-only list served to the platform in
//!   passive mode, with `since`/`limit` filtering.
//!
//! Both are explicitly constructed and carry their own synchronization, so
//! callers share them through an `Arc` and tests build isolated instances.
//! Nothing here is persisted.

pub mod error;
pub mod notifications;
pub mod tokens;

pub use error::StoreError;
pub use notifications::NotificationStore;
pub use tokens::TokenCache;

use std::sync::{LockResult, PoisonError};

/// Recovers the guard from a poisoned lock.
///
/// Entries are immutable values swapped in whole, so a panic while holding
/// the lock cannot leave a half-written entry behind.
pub(crate) fn recover<G>(result: LockResult<G>, store: &'static str) -> G {
    result.unwrap_or_else(|poisoned: PoisonError<G>| {
        tracing::error!(store, "store lock poisoned, recovering");
        poisoned.into_inner()
    })
}
