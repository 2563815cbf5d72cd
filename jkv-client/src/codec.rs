//! # Document Codec
//!
//! Purpose: Convert between JSON value trees and the byte form the store
//! keeps at the root document path, and build the document command
//! argument lists.

use serde_json::Value;

use crate::error::StoreResult;

/// Root path: every document is stored as the JSON root value of its key.
pub const ROOT_PATH: &[u8] = b".";

/// Serializes a document for a write at the root path.
pub fn encode_document(value: &Value) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decodes raw store bytes back into a JSON value tree.
///
/// Every fetched payload must round-trip through this before it is embedded
/// in a response envelope.
pub fn decode_document(bytes: &[u8]) -> StoreResult<Value> {
    Ok(serde_json::from_slice(bytes)?)
}

/// `JSON.SET <key> . <doc>` argument list.
pub fn set_args<'a>(key: &'a str, doc: &'a [u8]) -> [&'a [u8]; 4] {
    [b"JSON.SET", key.as_bytes(), ROOT_PATH, doc]
}

/// `JSON.GET <key> .` argument list.
pub fn get_args(key: &str) -> [&[u8]; 3] {
    [b"JSON.GET", key.as_bytes(), ROOT_PATH]
}

/// `JSON.DEL <key> .` argument list.
pub fn del_args(key: &str) -> [&[u8]; 3] {
    [b"JSON.DEL", key.as_bytes(), ROOT_PATH]
}
