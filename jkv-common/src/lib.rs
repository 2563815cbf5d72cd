// jkv-common - Shared types for the JsonKV cache service
//
// This crate defines the request/response envelopes exchanged over the HTTP
// boundary and the service configuration loaded once at startup.

pub mod config;
pub mod envelope;

// Re-export for convenience
pub use config::{Config, StoreSettings};
pub use envelope::{Envelope, InvalidExpiry, SetRequest, Status};
