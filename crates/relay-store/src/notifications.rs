//! Passive-mode notification list.
//!
//! Notifications are kept in insertion order. Reads go through
//! [`NotificationStore::list`], which applies an optional `since` filter and
//! then truncates to `limit`.

use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use relay_types::StoredNotification;

use crate::error::StoreError;
use crate::recover;

/// Append-only, insertion-ordered notification list.
#[derive(Debug, Default)]
pub struct NotificationStore {
    entries: RwLock<Vec<StoredNotification>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a notification.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if a notification with the same id
    /// is already stored.
    pub fn append(&self, notification: StoredNotification) -> Result<(), StoreError> {
        let mut entries = recover(self.entries.write(), "notifications");
        if entries.iter().any(|n| n.id == notification.id) {
            return Err(StoreError::DuplicateId(notification.id));
        }
        tracing::debug!(id = %notification.id, title = %notification.title, "stored notification");
        entries.push(notification);
        Ok(())
    }

    /// Returns up to `limit` notifications in insertion order.
    ///
    /// When `since` is given, only notifications strictly newer than it are
    /// considered. An unparsable `since` is logged and ignored.
    pub fn list(&self, since: Option<&str>, limit: usize) -> Vec<StoredNotification> {
        let cutoff = since
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|raw| {
                let parsed = parse_since(raw);
                if parsed.is_none() {
                    tracing::warn!(since = raw, "ignoring unparsable since filter");
                }
                parsed
            });

        recover(self.entries.read(), "notifications")
            .iter()
            .filter(|n| cutoff.map_or(true, |c| n.timestamp > c))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Looks up a notification by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no notification has that id.
    pub fn get(&self, id: &str) -> Result<StoredNotification, StoreError> {
        recover(self.entries.read(), "notifications")
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Removes every notification and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut entries = recover(self.entries.write(), "notifications");
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        recover(self.entries.read(), "notifications").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses a `since` query value.
///
/// Accepts RFC 3339 (`2024-05-01T12:00:00Z`, `2024-05-01T20:00:00+08:00`),
/// and naive date-times or dates, which are taken as UTC.
pub fn parse_since(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
