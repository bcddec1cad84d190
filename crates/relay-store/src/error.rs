//! Error types for the in-memory stores.

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No entry exists under the requested key.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entry with the same id is already stored.
    #[error("duplicate notification id: {0}")]
    DuplicateId(String),
}
