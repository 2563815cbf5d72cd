//! # JsonKV Store Access Layer
//!
//! Purpose: Provide the cancellable, pooled access layer between the HTTP
//! façade and the backing JSON-document store: a connection pool with idle
//! eviction and liveness probing, deadline-raced operations, a transactional
//! set-with-expiry protocol, and a chunked pattern-delete sweep.
//!
//! ## Design Principles
//!
//! 1. **Object Pool Pattern**: Reuse TCP connections to avoid repeated dials.
//! 2. **Deadline Racing**: Every store round-trip runs on its own task so the
//!    caller can stop waiting the moment its deadline fires.
//! 3. **RAII Release**: Borrowed connections flow back to the pool on every
//!    exit path, including abandonment after a timeout.
//! 4. **Typed Outcomes**: Misses and deletions are result variants, never
//!    error codes or sentinels.

mod codec;
mod deadline;
mod error;
mod pool;
mod resp;
mod scan;
mod store;

pub use deadline::Deadline;
pub use error::{StoreError, StoreResult};
pub use store::{DeleteStatus, DocumentStore};
