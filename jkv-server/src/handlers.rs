//! # Cache Handlers
//!
//! Purpose: Map each HTTP operation onto the store and shape every outcome
//! (hit, miss, timeout, failure) into the uniform response envelope.
//!
//! ## Design Principles
//!
//! 1. **Envelope Everywhere**: The handlers return the envelope shape for
//!    every outcome; raw store errors are logged here and never serialized.
//! 2. **Deadline Per Request**: Each call derives one deadline from the
//!    configured request timeout and threads it through the store.
//! 3. **Reject Early**: Empty keys, malformed bodies, and the bare wildcard
//!    never reach the access layer.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use jkv_client::{Deadline, DeleteStatus, StoreError};
use jkv_common::envelope::{Envelope, SetRequest};

use crate::routes::AppState;

type Reply = (StatusCode, Json<Envelope>);

/// POST /v1/cache
pub async fn set_key(
    State(state): State<AppState>,
    payload: Result<Json<SetRequest>, JsonRejection>,
) -> Reply {
    let Ok(Json(request)) = payload else {
        return respond(Envelope::failure(400, "Bad Request"));
    };
    if request.key.trim().is_empty() {
        return respond(Envelope::failure(400, "Bad Request"));
    }

    let deadline = Deadline::within(state.request_timeout);
    match state.store.set(deadline, &request).await {
        Ok(()) => respond(Envelope::ok(200, "Key successfully set")),
        Err(error) => respond(failure_envelope("set", error)),
    }
}

/// GET /v1/cache/{key}
pub async fn get_key(State(state): State<AppState>, Path(key): Path<String>) -> Reply {
    let deadline = Deadline::within(state.request_timeout);
    match state.store.get(deadline, &key).await {
        Ok(Some(payload)) => respond(Envelope::ok_with_payload(200, "Key available", payload)),
        Ok(None) => respond(Envelope::ok(200, "Key unavailable.")),
        Err(error) => respond(failure_envelope("get", error)),
    }
}

/// DELETE /v1/cache/{key}
pub async fn delete_key(State(state): State<AppState>, Path(key): Path<String>) -> Reply {
    let deadline = Deadline::within(state.request_timeout);
    match state.store.delete(deadline, &key).await {
        Ok(DeleteStatus::Missing) => respond(Envelope::ok(200, "Key unavailable.")),
        Ok(DeleteStatus::Removed(_)) => respond(Envelope::ok(200, "Key Deleted")),
        Err(error) => respond(failure_envelope("delete", error)),
    }
}

/// DELETE /v1/cache/pattern/{pattern}
pub async fn delete_pattern(State(state): State<AppState>, Path(pattern): Path<String>) -> Reply {
    if pattern.trim() == "*" {
        return respond(Envelope::failure(403, "Operation not allowed."));
    }

    let deadline = Deadline::within(state.request_timeout);
    match state.store.delete_matching(deadline, &pattern).await {
        Ok(0) => respond(Envelope::ok(200, "Keys unavailable.")),
        Ok(count) => respond(Envelope::ok_with_payload(200, "Key Deleted", count.into())),
        Err(error) => respond(failure_envelope("delete_pattern", error)),
    }
}

/// Translates a store failure into the fixed envelope for its class.
fn failure_envelope(op: &'static str, error: StoreError) -> Envelope {
    match error {
        StoreError::DeadlineExceeded => Envelope::failure(408, "Request Timeout."),
        StoreError::PatternForbidden => Envelope::failure(403, "Operation not allowed."),
        StoreError::InvalidExpiry => Envelope::failure(400, "Bad Request"),
        other => {
            tracing::error!(op, error = %other, "store operation failed");
            Envelope::failure(500, "Internal Server Error")
        }
    }
}

/// The HTTP status mirrors the envelope's code.
fn respond(envelope: Envelope) -> Reply {
    let status =
        StatusCode::from_u16(envelope.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope))
}
