//! # Store Error Taxonomy
//!
//! Purpose: Classify every failure the access layer can surface so the HTTP
//! boundary can translate each class into exactly one envelope shape.
//!
//! ## Design Principles
//!
//! 1. **Distinct Timeout**: Deadline expiry is never conflated with a
//!    transport failure.
//! 2. **Misses Are Not Errors**: Absent keys surface as result variants in
//!    the operation signatures, not here.
//! 3. **Pre-Store Rejection**: Invalid expiry options and forbidden patterns
//!    fail before any store interaction.

use thiserror::Error;

/// Result type used across the access layer.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by the access layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network or IO failure while talking to the store.
    #[error("transport failure: {0}")]
    Io(#[from] std::io::Error),

    /// Reply framing did not follow the wire protocol.
    #[error("malformed reply from the store")]
    Protocol,

    /// The store reported a command error.
    #[error("store rejected the command: {0}")]
    Reply(String),

    /// The reply type did not match the issued command.
    #[error("reply type did not match the command")]
    UnexpectedReply,

    /// A document failed to encode or decode as JSON.
    #[error("document is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),

    /// The caller's deadline elapsed before the store replied.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// The expiry option was present but not an integer number of seconds.
    #[error("expiry option must be a whole number of seconds")]
    InvalidExpiry,

    /// The pattern would sweep the entire keyspace.
    #[error("pattern must not match every key")]
    PatternForbidden,

    /// The pool was closed; no further operations are possible.
    #[error("connection pool is closed")]
    PoolClosed,
}

impl StoreError {
    /// Returns true for the distinct timeout outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::DeadlineExceeded)
    }
}
