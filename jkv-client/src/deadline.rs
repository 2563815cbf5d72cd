//! # Execution Deadline
//!
//! A deadline token scoping one logical operation. It carries no payload,
//! only the instant after which the caller stops waiting.

use std::time::Duration;

use tokio::time::Instant;

/// Deadline for a single operation, copied freely across tasks.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn within(timeout: Duration) -> Self {
        Deadline(Instant::now() + timeout)
    }

    /// Deadline at an explicit instant.
    pub fn at(instant: Instant) -> Self {
        Deadline(instant)
    }

    /// The instant the deadline fires.
    pub fn instant(self) -> Instant {
        self.0
    }

    /// Time remaining; zero once the deadline has passed.
    pub fn remaining(self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has already passed.
    pub fn has_elapsed(self) -> bool {
        self.remaining() == Duration::ZERO
    }
}
