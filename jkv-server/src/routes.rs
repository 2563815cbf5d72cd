//! # Router and Request Accounting
//!
//! Purpose: Wire the cache routes to their handlers and wrap every request
//! in a middleware that records metrics and logs with the route template as
//! the operation name. Names are static, never derived at runtime.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::time::Instant;

use jkv_client::DocumentStore;

use crate::handlers;
use crate::metrics::Metrics;

/// Shared dependencies handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Pooled access to the document store.
    pub store: DocumentStore,
    /// Deadline attached to each request.
    pub request_timeout: Duration,
    /// Request accounting.
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(store: DocumentStore, request_timeout: Duration) -> Self {
        AppState {
            store,
            request_timeout,
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/cache", post(handlers::set_key))
        .route(
            "/cache/{key}",
            get(handlers::get_key).delete(handlers::delete_key),
        )
        .route("/cache/pattern/{pattern}", delete(handlers::delete_pattern));

    Router::new()
        .nest("/v1", api)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_requests,
        ))
        .with_state(state)
}

/// Records one request into the metrics and logs entry/exit timing.
async fn track_requests(
    State(state): State<AppState>,
    matched: Option<MatchedPath>,
    request: Request,
    next: Next,
) -> Response {
    let route = match &matched {
        Some(path) => path.as_str().to_owned(),
        None => request.uri().path().to_owned(),
    };
    tracing::debug!(route = %route, "handling request");
    state.metrics.request_started();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    state
        .metrics
        .request_finished(elapsed, response.status().as_u16());
    tracing::info!(
        route = %route,
        status = response.status().as_u16(),
        elapsed_us = elapsed.as_micros() as u64,
        "request complete"
    );
    response
}
