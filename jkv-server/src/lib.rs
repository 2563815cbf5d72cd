//! # JsonKV HTTP Façade
//!
//! Purpose: Expose the document store over a small JSON HTTP API. The
//! handlers parse requests, attach a deadline, invoke the access layer, and
//! shape every outcome into the uniform response envelope.

pub mod handlers;
pub mod metrics;
pub mod routes;

pub use routes::{router, AppState};
