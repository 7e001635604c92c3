// src/error.rs

//! Cycle failures handed to the presentation sink.
//!
//! [`HttpSource`](crate::source::HttpSource) produces `Network`, `Status` and
//! `Parse`. Custom [`FeedSource`](crate::source::FeedSource) implementations
//! that don't go over reqwest (a file watcher, a message queue, a test double)
//! report "could not get data this cycle" with `Unavailable`; the dashboard
//! treats it like a network failure and keeps the previous state.

use thiserror::Error;

/// Cycle-level failures. Row-level problems never show up here: a row with
/// bad coordinates is dropped by the normalizer and the batch carries on.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("response body could not be parsed: {0}")]
    Parse(String),
    /// Raised by custom sources that don't go through reqwest.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl CycleError {
    /// Fetch rejected, non-success status, or a source that could not be reached.
    pub fn is_network(&self) -> bool {
        !matches!(self, CycleError::Parse(_))
    }
}
