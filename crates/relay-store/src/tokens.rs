//! Access token cache keyed by identity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use relay_types::CachedToken;

use crate::recover;

/// Lock-table size above which idle exchange locks are pruned.
const EXCHANGE_LOCK_PRUNE_THRESHOLD: usize = 10_000;

/// Process-wide cache of access tokens, one entry per identity.
///
/// Uses `std::sync` locks: every acquisition is a short `HashMap`
/// operation that never spans an `.await`. Entries are stored behind `Arc`
/// and replaced whole, so readers never observe a mix of old and new fields.
///
/// There is no expiry. An entry lives until it is deleted, the cache is
/// cleared, or a fresh exchange replaces it.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: RwLock<HashMap<String, Arc<CachedToken>>>,
    exchange_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token for `identity`, if any.
    pub fn get(&self, identity: &str) -> Option<Arc<CachedToken>> {
        recover(self.entries.read(), "tokens").get(identity).cloned()
    }

    /// Inserts or replaces the entry for `token.identity`.
    ///
    /// Returns the entry that was replaced, if any.
    pub fn put(&self, token: CachedToken) -> Option<Arc<CachedToken>> {
        let identity = token.identity.clone();
        let previous =
            recover(self.entries.write(), "tokens").insert(identity.clone(), Arc::new(token));
        tracing::debug!(
            identity = %identity,
            replaced = previous.is_some(),
            "cached access token"
        );
        previous
    }

    /// Removes the entry for `identity`. Returns `true` if one existed.
    ///
    /// The identity's exchange lock is dropped only if nobody holds or
    /// waits on it; an in-flight exchange keeps serializing later callers.
    pub fn delete(&self, identity: &str) -> bool {
        let removed = recover(self.entries.write(), "tokens")
            .remove(identity)
            .is_some();
        let mut locks = recover(self.exchange_locks.lock(), "exchange-locks");
        if locks
            .get(identity)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(identity);
        }
        removed
    }

    /// Empties the cache and returns how many entries it held.
    pub fn clear(&self) -> usize {
        let count = {
            let mut entries = recover(self.entries.write(), "tokens");
            let count = entries.len();
            entries.clear();
            count
        };
        recover(self.exchange_locks.lock(), "exchange-locks")
            .retain(|_, lock| Arc::strong_count(lock) > 1);
        count
    }

    /// Snapshot of all entries, oldest first.
    pub fn list(&self) -> Vec<Arc<CachedToken>> {
        let mut tokens: Vec<Arc<CachedToken>> = recover(self.entries.read(), "tokens")
            .values()
            .cloned()
            .collect();
        tokens.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        tokens
    }

    pub fn len(&self) -> usize {
        recover(self.entries.read(), "tokens").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the exchange lock for `identity`.
    ///
    /// Callers hold the returned async mutex across the check-cache,
    /// exchange, store-token sequence so that concurrent requests for the
    /// same not-yet-cached identity issue a single exchange.
    pub fn exchange_lock(&self, identity: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = recover(self.exchange_locks.lock(), "exchange-locks");

        // Locks for identities whose exchange failed, or that were in use
        // during delete/clear, stay behind. Drop the ones nobody is holding
        // or waiting on.
        if locks.len() > EXCHANGE_LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks
            .entry(identity.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
