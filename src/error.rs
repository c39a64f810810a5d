//! Failure taxonomy for sync calls.
//!
//! Every sync operation surfaces exactly one of two failure kinds to its
//! caller: something went wrong talking to the upstream API, or something
//! went wrong reading/writing the mirror. Audit-log writes and per-record
//! reference skips are deliberately not failures (see `api` and `sync`).

use thiserror::Error;

/// A failure while talking to the upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport-level failure (connect, timeout, body decode).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx status that is not a rate-limit signal.
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    /// The envelope carried a non-empty `errors` field.
    #[error("api declared errors: {0}")]
    ApiErrors(String),

    /// The envelope was missing its `response` field.
    #[error("api envelope missing `response` field")]
    MissingResponse,

    /// Still rate-limited after the configured number of attempts.
    #[error("rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },
}

/// A failure surfaced by a sync call.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("upstream failure: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),
}
