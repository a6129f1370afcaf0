//! # Connection Controller
//!
//! Opens a secure stream to the departures host, sends a minimal HTTP/1.0
//! request and leaves the stream positioned at the start of the body.
//!
//! ## Budgets
//! - **Connect**: up to `connect_attempts` tries, `connect_retry_delay_ms`
//!   apart (15 × 200 ms by default)
//! - **First byte**: up to `response_attempts` polls, `response_poll_delay_ms`
//!   apart (40 × 200 ms by default)
//!
//! ## Status Classification
//! | Status line            | Result |
//! |------------------------|--------|
//! | `HTTP/x 200 ...`       | continue to headers |
//! | 401, 429               | [`FeedError::Unauthorized`] |
//! | 500                    | [`FeedError::DataError`] |
//! | 404 (lookup endpoints) | [`FeedError::DataError`] |
//! | anything else          | [`FeedError::Http`] |
//!
//! Only `Transfer-Encoding` is inspected among the headers. A chunked body is
//! flagged but not decoded; callers surface the flag as a warning.

use crate::config::TimingConfig;
use crate::error::FeedError;
use crate::stream::SecureStream;
use std::thread;
use tracing::{debug, warn};

/// One GET request against the feed host.
#[derive(Clone, Debug)]
pub struct Request<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: String,
    /// Classify 404 as a data error rather than a plain HTTP error
    pub missing_is_data_error: bool,
}

impl Request<'_> {
    /// Wire form: request line plus `Host` and `Connection: close`.
    pub fn render(&self) -> String {
        format!(
            "GET {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.path, self.host
        )
    }
}

/// What was learned from the status line and headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseHead {
    pub status_line: String,
    /// `Transfer-Encoding: chunked` was announced; the body is read raw
    pub chunked: bool,
}

/// Connect, send `request`, check the status and skip the headers.
///
/// On success the stream is open and positioned at the first body byte. On
/// any failure after connecting the stream has been closed.
pub fn open<S: SecureStream>(
    stream: &mut S,
    request: &Request<'_>,
    timing: &TimingConfig,
) -> Result<ResponseHead, FeedError> {
    stream.set_timeout(timing.read_timeout());
    connect_with_retry(stream, request.host, request.port, timing)?;

    debug!(host = request.host, path = %request.path, "Sending request");
    if let Err(e) = stream.print(request.render().as_bytes()) {
        stream.close();
        return Err(FeedError::Send(e));
    }

    if let Err(e) = wait_for_response(stream, timing) {
        stream.close();
        return Err(e);
    }

    let status_line = stream.read_line_until(b'\n').trim_end().to_string();
    if let Err(e) = classify_status(&status_line, request.missing_is_data_error) {
        stream.close();
        return Err(e);
    }

    let chunked = skip_headers(stream);
    if chunked {
        warn!(path = %request.path, "Chunked response; body is read without dechunking");
    }
    Ok(ResponseHead {
        status_line,
        chunked,
    })
}

fn connect_with_retry<S: SecureStream>(
    stream: &mut S,
    host: &str,
    port: u16,
    timing: &TimingConfig,
) -> Result<(), FeedError> {
    for attempt in 1..=timing.connect_attempts {
        if stream.connect(host, port) {
            debug!(host, attempt, "Connected");
            return Ok(());
        }
        if attempt < timing.connect_attempts {
            thread::sleep(timing.connect_retry_delay());
        }
    }
    debug!(host, attempts = timing.connect_attempts, "Connection retry budget exhausted");
    Err(FeedError::ConnectionTimeout)
}

fn wait_for_response<S: SecureStream>(
    stream: &mut S,
    timing: &TimingConfig,
) -> Result<(), FeedError> {
    let mut polls = 0;
    while !stream.available() {
        if polls >= timing.response_attempts {
            return Err(FeedError::ResponseTimeout);
        }
        polls += 1;
        thread::sleep(timing.response_poll_delay());
    }
    Ok(())
}

/// Status code from a line such as `HTTP/1.1 200 OK`.
pub fn status_code(status_line: &str) -> Option<u16> {
    status_line.split_whitespace().nth(1)?.parse().ok()
}

/// Accept a 200 status line or classify the failure.
pub fn classify_status(status_line: &str, missing_is_data_error: bool) -> Result<(), FeedError> {
    let code = status_code(status_line);
    if status_line.starts_with("HTTP/") && code == Some(200) {
        return Ok(());
    }
    debug!(status_line, "Unexpected status");
    let status_line = status_line.to_string();
    Err(match code {
        Some(401) | Some(429) => FeedError::Unauthorized { status_line },
        Some(500) => FeedError::DataError(status_line),
        Some(404) if missing_is_data_error => FeedError::DataError(status_line),
        _ => FeedError::Http { status_line },
    })
}

/// Consume header lines up to the blank separator. Returns the chunked flag.
fn skip_headers<S: SecureStream>(stream: &mut S) -> bool {
    let mut chunked = false;
    while stream.connected() || stream.available() {
        let line = stream.read_line_until(b'\n');
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
            {
                chunked = true;
            }
        }
    }
    chunked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::UpdateOutcome;
    use crate::testutil::{fast_timing, ScriptedStream};

    fn departures_request() -> Request<'static> {
        Request {
            host: "bustimes.org",
            port: 443,
            path: "/stops/340000004H3/departures".to_string(),
            missing_is_data_error: false,
        }
    }

    #[test]
    fn test_request_wire_format() {
        assert_eq!(
            departures_request().render(),
            "GET /stops/340000004H3/departures HTTP/1.0\r\nHost: bustimes.org\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn test_open_positions_stream_at_body() {
        let mut stream = ScriptedStream::ok("<html>\n<body>\n");
        let head = open(&mut stream, &departures_request(), &fast_timing()).unwrap();

        assert_eq!(head.status_line, "HTTP/1.1 200 OK");
        assert!(!head.chunked);
        assert!(stream.sent_text().starts_with("GET /stops/340000004H3/departures HTTP/1.0"));
        assert_eq!(stream.read_line_until(b'\n'), "<html>");
        assert_eq!(stream.timeout, Some(fast_timing().read_timeout()));
    }

    #[test]
    fn test_chunked_header_is_flagged() {
        let mut stream = ScriptedStream::with_response(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1a\r\n<html>\r\n",
        );
        let head = open(&mut stream, &departures_request(), &fast_timing()).unwrap();
        assert!(head.chunked);
        // Chunk sizes are left in the body
        assert_eq!(stream.read_line_until(b'\n'), "1a\r");
    }

    #[test]
    fn test_connection_retry_budget() {
        let mut stream = ScriptedStream::unreachable();
        let err = open(&mut stream, &departures_request(), &fast_timing()).unwrap_err();
        assert!(matches!(err, FeedError::ConnectionTimeout));
        assert_eq!(stream.connect_calls, 15);
        assert!(stream.sent.is_empty());
    }

    #[test]
    fn test_connect_succeeds_after_retries() {
        let mut stream = ScriptedStream::ok("");
        stream.connect_failures = 14;
        assert!(open(&mut stream, &departures_request(), &fast_timing()).is_ok());
        assert_eq!(stream.connect_calls, 15);
    }

    #[test]
    fn test_silent_server_is_a_response_timeout() {
        let mut stream = ScriptedStream::ok("");
        stream.silent = true;
        let err = open(&mut stream, &departures_request(), &fast_timing()).unwrap_err();
        assert_eq!(err.outcome(), UpdateOutcome::ResponseTimeout);
        assert_eq!(stream.close_calls, 1);
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status("HTTP/1.1 200 OK", false).is_ok());
        assert!(classify_status("HTTP/1.0 200 OK", false).is_ok());

        let outcome = |line: &str, lookup: bool| classify_status(line, lookup).unwrap_err().outcome();
        assert_eq!(outcome("HTTP/1.1 401 Unauthorized", false), UpdateOutcome::Unauthorized);
        assert_eq!(outcome("HTTP/1.1 429 Too Many Requests", false), UpdateOutcome::Unauthorized);
        assert_eq!(outcome("HTTP/1.1 500 Internal Server Error", false), UpdateOutcome::DataError);
        assert_eq!(outcome("HTTP/1.1 404 Not Found", false), UpdateOutcome::HttpError);
        assert_eq!(outcome("HTTP/1.1 404 Not Found", true), UpdateOutcome::DataError);
        assert_eq!(outcome("HTTP/1.1 503 Service Unavailable", false), UpdateOutcome::HttpError);
        assert_eq!(outcome("garbage 200 OK", false), UpdateOutcome::HttpError);
        assert_eq!(outcome("", false), UpdateOutcome::HttpError);
    }

    #[test]
    fn test_error_status_keeps_status_line() {
        let mut stream = ScriptedStream::with_response("HTTP/1.1 503 Service Unavailable\r\n\r\n");
        let err = open(&mut stream, &departures_request(), &fast_timing()).unwrap_err();
        assert_eq!(err.to_string(), "HTTP/1.1 503 Service Unavailable");
        assert_eq!(stream.close_calls, 1);
    }
}
