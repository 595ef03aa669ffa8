//! Cancellation and per-repository deadlines.
//!
//! A scan owns one `CancelToken`.  Each repository gets its own `Deadline`
//! combining that token with a timeout, so one slow repository fails on its
//! own without stopping its siblings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use conductor_contracts::error::CollectorError;

/// Shared flag used to cancel an in-flight scan.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.  Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Cancellation plus an optional time budget for one repository.
#[derive(Debug, Clone)]
pub struct Deadline {
    started: Instant,
    timeout: Option<Duration>,
    token: CancelToken,
}

impl Deadline {
    /// A deadline that expires `timeout` from now, or never when `None`.
    pub fn new(timeout: Option<Duration>, token: CancelToken) -> Self {
        Self {
            started: Instant::now(),
            timeout,
            token,
        }
    }

    /// A deadline that never expires and cannot be cancelled from outside.
    pub fn unbounded() -> Self {
        Self::new(None, CancelToken::new())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before expiry; `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.timeout
            .map(|timeout| timeout.saturating_sub(self.started.elapsed()))
    }

    /// Fail with `Cancelled` or `TimedOut` once the deadline no longer holds.
    pub fn check(&self) -> Result<(), CollectorError> {
        if self.token.is_cancelled() {
            return Err(CollectorError::Cancelled);
        }
        if let Some(timeout) = self.timeout {
            let elapsed = self.started.elapsed();
            if elapsed >= timeout {
                return Err(CollectorError::TimedOut {
                    elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }
        Ok(())
    }
}
