//! In-memory [`SecureStream`] for exercising the connection controller and
//! the acquisition cycle without a network.

use crate::config::TimingConfig;
use crate::stream::SecureStream;
use std::io;
use std::thread;
use std::time::Duration;

/// Scripted stream that replays a canned response.
#[derive(Debug, Default)]
pub struct ScriptedStream {
    /// Connect calls that fail before one succeeds; `usize::MAX` never connects
    pub connect_failures: usize,
    /// Connect calls made so far
    pub connect_calls: usize,
    /// Bytes served after the request is written
    pub response: Vec<u8>,
    /// Never report data as available (server accepted but stays silent)
    pub silent: bool,
    /// Keep reporting connected after the response is drained
    pub hold_open: bool,
    /// Everything written by the client
    pub sent: Vec<u8>,
    pub close_calls: usize,
    pub timeout: Option<Duration>,
    /// Pause before each line is handed out, to simulate a slow link
    pub line_delay: Option<Duration>,
    pos: usize,
    is_connected: bool,
}

impl ScriptedStream {
    pub fn with_response(response: &str) -> Self {
        Self {
            response: response.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    /// `200 OK` response with the given body.
    pub fn ok(body: &str) -> Self {
        Self::with_response(&format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n{body}"
        ))
    }

    pub fn unreachable() -> Self {
        Self {
            connect_failures: usize::MAX,
            ..Self::default()
        }
    }

    /// `200 OK` page padded with `filler_lines` lines before `</body>`, each
    /// line arriving `line_delay` after the previous one.
    pub fn trickle(filler_lines: usize, line_delay: Duration) -> Self {
        let mut body = String::from("<html>\n<body>\n");
        for _ in 0..filler_lines {
            body.push_str("<p>filler</p>\n");
        }
        body.push_str("</body>\n");
        Self {
            line_delay: Some(line_delay),
            ..Self::ok(&body)
        }
    }

    pub fn sent_text(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }

    fn remaining(&self) -> bool {
        self.pos < self.response.len()
    }
}

impl SecureStream for ScriptedStream {
    fn connect(&mut self, _host: &str, _port: u16) -> bool {
        self.connect_calls += 1;
        if self.connect_calls <= self.connect_failures {
            return false;
        }
        self.is_connected = true;
        true
    }

    fn print(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.is_connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "not connected"));
        }
        self.sent.extend_from_slice(data);
        Ok(())
    }

    fn read_line_until(&mut self, delimiter: u8) -> String {
        if let Some(delay) = self.line_delay {
            thread::sleep(delay);
        }
        let mut line = Vec::new();
        while let Some(byte) = self.read_byte() {
            if byte == delimiter {
                break;
            }
            line.push(byte);
        }
        String::from_utf8_lossy(&line).into_owned()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.silent || !self.is_connected {
            return None;
        }
        let byte = self.response.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        byte
    }

    fn available(&mut self) -> bool {
        self.is_connected && !self.silent && self.remaining()
    }

    fn connected(&mut self) -> bool {
        self.is_connected && (self.hold_open || self.remaining())
    }

    fn close(&mut self) {
        self.close_calls += 1;
        self.is_connected = false;
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }
}

/// Timing with no pauses and a short body deadline.
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        connect_retry_delay_ms: 0,
        response_poll_delay_ms: 0,
        lookup_poll_delay_ms: 0,
        body_deadline_secs: 1,
        progress_interval_ms: 0,
        ..TimingConfig::default()
    }
}
