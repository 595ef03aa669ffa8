//! Error types for the conductor pipeline.
//!
//! Two families live here:
//!
//! - `ConductorError` covers the local, non-retryable failures of the core:
//!   rejected policy text, unreadable profile files, bad configuration.
//! - `CollectorError` covers the Source Collector boundary.  It carries
//!   enough HTTP detail for adapters to decide whether a call is retryable.
//!
//! Policy denials and profile mismatches are NOT errors.  They surface as
//! `Violation` values inside a `RepoResult`.

use thiserror::Error;

/// The unified error type for the conductor crates.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// Policy text was rejected at registration time.  The store is unchanged.
    #[error("parsing policy {policy_id}: {reason}")]
    PolicyParse { policy_id: String, reason: String },

    /// A policy file or directory could not be read or registered.
    #[error("loading policy from {path}: {reason}")]
    PolicyLoad { path: String, reason: String },

    /// `ProfileRegistry::get` was asked for a name it does not hold.
    ///
    /// `get_or_default` never produces this; it resolves through the fallback chain.
    #[error("profile not found: {name}")]
    ProfileNotFound { name: String },

    /// A profile file or directory could not be read or parsed.
    #[error("loading profile from {path}: {reason}")]
    ProfileLoad { path: String, reason: String },

    /// A collector operation failed in a way that aborts the whole scan.
    ///
    /// Only repository listing can do this; per-repository failures are
    /// recorded on that repository's `RepoResult` instead.
    #[error("{operation} for {target}: {source}")]
    Collector {
        operation: String,
        target: String,
        #[source]
        source: CollectorError,
    },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

/// Convenience alias used throughout the conductor crates.
pub type ConductorResult<T> = Result<T, ConductorError>;

/// Rate-limit signals reported by the remote source alongside an HTTP status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Value of the remaining-requests header, when present.
    pub remaining: Option<u32>,
    /// Value of the request-limit header, when present.
    pub limit: Option<u32>,
    /// Value of the `Retry-After` header in seconds, when present.
    pub retry_after_secs: Option<u64>,
}

/// Failure of a single Source Collector call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectorError {
    /// The remote source answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        rate_limit: RateLimitInfo,
    },

    /// The request never produced a response (connection reset, DNS, ...).
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The requested entity does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The scan was cancelled before this call completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The per-repository deadline expired.
    #[error("operation timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },
}

impl CollectorError {
    /// Return true if repeating the call may succeed.
    ///
    /// Transport failures are always retryable.  403 and 429 are retryable
    /// only when the response carries rate-limit evidence (remaining = 0,
    /// a `Retry-After`, or a limit header).  500, 502, 503 and 504 are
    /// retryable.  Everything else, including cancellation and timeouts, is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollectorError::Transport { .. } => true,
            CollectorError::Http {
                status, rate_limit, ..
            } => match status {
                403 | 429 => {
                    rate_limit.remaining == Some(0)
                        || rate_limit.retry_after_secs.is_some()
                        || rate_limit.limit.is_some()
                }
                500 | 502 | 503 | 504 => true,
                _ => false,
            },
            CollectorError::NotFound { .. }
            | CollectorError::Cancelled
            | CollectorError::TimedOut { .. } => false,
        }
    }

    /// The server-requested delay before retrying, if it sent one.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            CollectorError::Http { rate_limit, .. } => rate_limit.retry_after_secs,
            _ => None,
        }
    }
}
