//! # Update Results
//!
//! Every acquisition cycle ends in exactly one [`UpdateReport`]: a closed
//! outcome code plus a short diagnostic message. Nothing is thrown past the
//! client boundary, so the host loop only ever has to look at the outcome to
//! decide whether to redraw, back off or stop.

use crate::config::BoardConfig;
use crate::error::FeedError;
use std::fmt;
use std::time::Duration;

/// Closed set of cycle results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateOutcome {
    /// Board committed and materially changed
    Success,
    /// Board committed, nothing worth redrawing
    NoChange,
    ConnectionTimeout,
    ResponseTimeout,
    /// 401/429 from upstream; hard stop
    Unauthorized,
    DataError,
    HttpError,
    /// Body deadline exceeded mid-parse; nothing committed
    Timeout,
    /// Lookup JSON ended mid-document
    Incomplete,
}

impl UpdateOutcome {
    /// True when the cycle replaced the caller's board.
    pub fn is_committed(self) -> bool {
        matches!(self, UpdateOutcome::Success | UpdateOutcome::NoChange)
    }

    /// Status label used in logs and the terminal footer.
    pub fn label(self) -> &'static str {
        match self {
            UpdateOutcome::Success => "SUCCESS",
            UpdateOutcome::NoChange => "SUCCESS (NO CHANGES)",
            UpdateOutcome::ConnectionTimeout => "NO RESPONSE FROM SERVER",
            UpdateOutcome::ResponseTimeout | UpdateOutcome::Timeout => "TIMEOUT WAITING FOR SERVER",
            UpdateOutcome::Unauthorized => "UNAUTHORISED",
            UpdateOutcome::DataError => "DATA ERROR",
            UpdateOutcome::HttpError => "HTTP ERROR",
            UpdateOutcome::Incomplete => "INCOMPLETE JSON RECEIVED",
        }
    }

    /// How long the caller should wait before the next cycle.
    ///
    /// `None` means do not retry: the credentials or rate limit need a human.
    pub fn next_poll(self, board: &BoardConfig) -> Option<Duration> {
        match self {
            UpdateOutcome::Unauthorized => None,
            UpdateOutcome::DataError | UpdateOutcome::Timeout => {
                Some(Duration::from_secs(board.error_backoff_secs))
            }
            _ => Some(Duration::from_secs(board.refresh_secs)),
        }
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome plus diagnostic text for one cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateReport {
    pub outcome: UpdateOutcome,
    pub message: String,
}

impl UpdateReport {
    /// Report for a committed cycle, e.g.
    /// `"SUCCESS [Primary Service Changed] Update took: 812ms [10342]"`.
    pub fn committed(changed: bool, elapsed: Duration, bytes: usize, chunked: bool) -> Self {
        let mut message = String::new();
        if chunked {
            message.push_str("WARNING: Chunked response! ");
        }
        let (outcome, headline) = if changed {
            (UpdateOutcome::Success, "SUCCESS [Primary Service Changed]")
        } else {
            (UpdateOutcome::NoChange, "SUCCESS")
        };
        message.push_str(&format!(
            "{headline} Update took: {}ms [{bytes}]",
            elapsed.as_millis()
        ));
        Self { outcome, message }
    }

    pub fn failed(error: &FeedError) -> Self {
        Self {
            outcome: error.outcome(),
            message: error.to_string(),
        }
    }
}

impl From<FeedError> for UpdateReport {
    fn from(error: FeedError) -> Self {
        Self::failed(&error)
    }
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.outcome, self.message)
    }
}
