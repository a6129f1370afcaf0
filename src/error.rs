//! Acquisition failure taxonomy.

use crate::report::UpdateOutcome;
use std::io;
use thiserror::Error;

/// Errors that can end an acquisition cycle before anything is committed.
///
/// Each variant maps onto exactly one [`UpdateOutcome`]; the `Display` text
/// is the diagnostic message shown to the user.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Connection retry budget exhausted
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// Request could not be written to an open connection
    #[error("Connection lost while sending request: {0}")]
    Send(#[source] io::Error),

    /// Nothing arrived within the first-byte budget
    #[error("Response timeout")]
    ResponseTimeout,

    /// 401 or 429; the caller must stop and re-authenticate
    #[error("Not Authorized")]
    Unauthorized { status_line: String },

    /// Upstream reported a server-side problem (or the page was truncated)
    #[error("{0}")]
    DataError(String),

    /// Any other non-success status line
    #[error("{status_line}")]
    Http { status_line: String },

    /// Body deadline passed before the parse completed
    #[error("Timed out during data receive operation - {bytes} bytes received")]
    Timeout { bytes: usize },

    /// Lookup body ended before its JSON document was closed
    #[error("Incomplete JSON received")]
    Incomplete,
}

impl FeedError {
    pub fn outcome(&self) -> UpdateOutcome {
        match self {
            FeedError::ConnectionTimeout | FeedError::Send(_) => UpdateOutcome::ConnectionTimeout,
            FeedError::ResponseTimeout => UpdateOutcome::ResponseTimeout,
            FeedError::Unauthorized { .. } => UpdateOutcome::Unauthorized,
            FeedError::DataError(_) => UpdateOutcome::DataError,
            FeedError::Http { .. } => UpdateOutcome::HttpError,
            FeedError::Timeout { .. } => UpdateOutcome::Timeout,
            FeedError::Incomplete => UpdateOutcome::Incomplete,
        }
    }
}
