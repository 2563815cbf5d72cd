//! # Request Metrics
//!
//! Purpose: Count requests, failures, and timeouts and accumulate latency
//! so the service can report throughput and error rate cheaply.
//!
//! ## Design Principles
//!
//! 1. **Accumulator Pattern**: Atomic counters aggregate events without
//!    locks on the request path.
//! 2. **Relaxed Ordering**: Counters need eventual consistency only, not
//!    cross-field ordering.
//! 3. **Plain Snapshots**: Reads produce an owned struct with no further
//!    synchronization.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time view of the request counters.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Completed requests.
    pub requests_total: u64,
    /// Requests that ended in a 5xx envelope.
    pub errors_total: u64,
    /// Requests that ended in the timeout envelope.
    pub timeouts_total: u64,
    /// Requests currently being handled.
    pub inflight: u64,
    /// Sum of request latencies in microseconds.
    pub latency_sum_us: u64,
    /// Number of latency samples.
    pub latency_samples: u64,
}

impl MetricsSnapshot {
    /// Mean latency over all samples.
    pub fn mean_latency(&self) -> Duration {
        if self.latency_samples == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.latency_sum_us / self.latency_samples)
    }
}

/// Thread-safe request accounting shared across handlers.
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    errors_total: AtomicU64,
    timeouts_total: AtomicU64,
    inflight: AtomicU64,
    latency_sum_us: AtomicU64,
    latency_samples: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    /// Marks a request as in flight.
    pub fn request_started(&self) {
        self.inflight.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a finished request with its latency and envelope code.
    pub fn request_finished(&self, latency: Duration, code: u16) {
        self.inflight.fetch_sub(1, Ordering::Relaxed);
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if code >= 500 {
            self.errors_total.fetch_add(1, Ordering::Relaxed);
        }
        if code == 408 {
            self.timeouts_total.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters into a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            timeouts_total: self.timeouts_total.load(Ordering::Relaxed),
            inflight: self.inflight.load(Ordering::Relaxed),
            latency_sum_us: self.latency_sum_us.load(Ordering::Relaxed),
            latency_samples: self.latency_samples.load(Ordering::Relaxed),
        }
    }
}
