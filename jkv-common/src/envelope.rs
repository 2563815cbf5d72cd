//! # Request and Response Envelopes
//!
//! Purpose: Define the only shapes that cross the service boundary: the
//! set-request payload accepted by the HTTP layer and the uniform response
//! envelope returned for every operation, win or lose.
//!
//! ## Design Principles
//!
//! 1. **Single Contract**: Every operation produces an `Envelope`; callers
//!    never see raw store errors.
//! 2. **Inert Options**: Unknown option keys are carried but ignored, leaving
//!    room for future extensions.
//! 3. **Typed Extraction**: The `expiry` option is validated once, up front,
//!    before any store interaction.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload accepted by the set endpoint.
///
/// `options["expiry"]`, when present, is an integer number of seconds and
/// switches the write into the transactional set+expire protocol. Other
/// option keys are currently inert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRequest {
    /// Document key; must be non-empty.
    pub key: String,
    /// Write options keyed by name.
    #[serde(default)]
    pub options: Map<String, Value>,
    /// Arbitrary JSON document to store.
    pub value: Value,
}

impl SetRequest {
    /// Builds a plain set request with no options.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        SetRequest {
            key: key.into(),
            options: Map::new(),
            value,
        }
    }

    /// Extracts the expiry option in seconds.
    ///
    /// Returns `Ok(None)` when the option is absent and `Err(InvalidExpiry)`
    /// when it is present but not a non-negative integer.
    pub fn expiry_seconds(&self) -> Result<Option<u64>, InvalidExpiry> {
        match self.options.get("expiry") {
            None => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or(InvalidExpiry),
        }
    }
}

/// The `expiry` option was present but not a whole number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidExpiry;

impl fmt::Display for InvalidExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expiry option must be a whole number of seconds")
    }
}

impl std::error::Error for InvalidExpiry {}

/// Outcome marker carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The operation completed; the message describes the result.
    Ok,
    /// The operation failed; the code pins down the failure class.
    Failure,
}

/// Uniform response shape returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Coarse outcome marker.
    pub status: Status,
    /// HTTP-like status code mirrored by the transport.
    pub code: u16,
    /// Human-readable result description.
    pub message: String,
    /// Optional JSON payload (fetched document, deletion count).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    /// Successful outcome without payload.
    pub fn ok(code: u16, message: impl Into<String>) -> Self {
        Envelope {
            status: Status::Ok,
            code,
            message: message.into(),
            payload: None,
        }
    }

    /// Successful outcome carrying a JSON payload.
    pub fn ok_with_payload(code: u16, message: impl Into<String>, payload: Value) -> Self {
        Envelope {
            status: Status::Ok,
            code,
            message: message.into(),
            payload: Some(payload),
        }
    }

    /// Failed outcome without payload.
    pub fn failure(code: u16, message: impl Into<String>) -> Self {
        Envelope {
            status: Status::Failure,
            code,
            message: message.into(),
            payload: None,
        }
    }
}
