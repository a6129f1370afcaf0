//! # Secure Stream Capability
//!
//! The connection controller talks to the upstream host through the small
//! [`SecureStream`] interface: connect, write the request, then pull lines or
//! single bytes as they arrive. The stream itself has no retry or deadline
//! policy; those live in [`crate::http`] and [`crate::client`].
//!
//! [`TlsStream`] is the production implementation: a blocking
//! `std::net::TcpStream` wrapped in a rustls client session, verified against
//! the webpki root store.

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Byte-oriented secure stream used by the connection controller.
pub trait SecureStream {
    /// Open a connection to `host:port`, replacing any previous one.
    fn connect(&mut self, host: &str, port: u16) -> bool;

    /// Write `data` to the open connection.
    fn print(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read up to (not including) `delimiter`, end of stream or the read
    /// timeout, whichever comes first. Invalid UTF-8 is replaced.
    fn read_line_until(&mut self, delimiter: u8) -> String;

    /// Next byte, or `None` on end of stream or timeout.
    fn read_byte(&mut self) -> Option<u8>;

    /// True if at least one byte can be read without waiting.
    fn available(&mut self) -> bool;

    /// True while the peer has not closed the connection.
    fn connected(&mut self) -> bool;

    fn close(&mut self);

    /// Per-call timeout for `read_line_until` and `read_byte`.
    fn set_timeout(&mut self, timeout: Duration);
}

/// TLS setup failures.
#[derive(Error, Debug)]
pub enum TlsSetupError {
    #[error("TLS configuration: {0}")]
    Config(#[from] rustls::Error),
}

/// Poll used by `available()`; short enough to keep retry loops honest.
const POLL_TIMEOUT: Duration = Duration::from_millis(1);
const READ_CHUNK: usize = 1024;

/// rustls-backed [`SecureStream`].
pub struct TlsStream {
    config: Arc<ClientConfig>,
    session: Option<StreamOwned<ClientConnection, TcpStream>>,
    pending: VecDeque<u8>,
    eof: bool,
    timeout: Duration,
}

impl TlsStream {
    /// Create a stream trusting the bundled webpki roots.
    pub fn new() -> Result<Self, TlsSetupError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            config: Arc::new(config),
            session: None,
            pending: VecDeque::new(),
            eof: true,
            timeout: Duration::from_secs(15),
        })
    }

    fn open(&self, host: &str, port: u16) -> io::Result<StreamOwned<ClientConnection, TcpStream>> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let mut conn = ClientConnection::new(self.config.clone(), server_name)
            .map_err(io::Error::other)?;

        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "host did not resolve");
        for addr in (host, port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(mut sock) => {
                    sock.set_read_timeout(Some(self.timeout))?;
                    sock.set_write_timeout(Some(self.timeout))?;
                    while conn.is_handshaking() {
                        conn.complete_io(&mut sock)?;
                    }
                    return Ok(StreamOwned::new(conn, sock));
                }
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    /// Pull whatever the session yields within `wait` into the pending buffer.
    fn fill(&mut self, wait: Duration) {
        let Some(session) = self.session.as_mut() else {
            self.eof = true;
            return;
        };
        // A zero read timeout is rejected by the OS layer.
        let wait = wait.max(POLL_TIMEOUT);
        if session.sock.set_read_timeout(Some(wait)).is_err() {
            self.eof = true;
            return;
        }

        let mut chunk = [0u8; READ_CHUNK];
        match session.read(&mut chunk) {
            Ok(0) => self.eof = true,
            Ok(n) => self.pending.extend(&chunk[..n]),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!("TLS read ended: {}", e);
                self.eof = true;
            }
        }
    }
}

impl SecureStream for TlsStream {
    fn connect(&mut self, host: &str, port: u16) -> bool {
        self.close();
        match self.open(host, port) {
            Ok(session) => {
                self.session = Some(session);
                self.eof = false;
                true
            }
            Err(e) => {
                debug!(host, port, "Connect failed: {}", e);
                false
            }
        }
    }

    fn print(&mut self, data: &[u8]) -> io::Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "not connected"))?;
        session.write_all(data)?;
        session.flush()
    }

    fn read_line_until(&mut self, delimiter: u8) -> String {
        let deadline = Instant::now() + self.timeout;
        let mut line = Vec::new();
        loop {
            if let Some(byte) = self.pending.pop_front() {
                if byte == delimiter {
                    break;
                }
                line.push(byte);
                continue;
            }
            let now = Instant::now();
            if self.eof || now >= deadline {
                break;
            }
            self.fill(deadline - now);
        }
        String::from_utf8_lossy(&line).into_owned()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.pending.is_empty() && !self.eof {
            self.fill(self.timeout);
        }
        self.pending.pop_front()
    }

    fn available(&mut self) -> bool {
        if self.pending.is_empty() && !self.eof {
            self.fill(POLL_TIMEOUT);
        }
        !self.pending.is_empty()
    }

    fn connected(&mut self) -> bool {
        self.session.is_some() && !self.eof
    }

    fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.conn.send_close_notify();
            let _ = session.conn.complete_io(&mut session.sock);
            let _ = session.sock.shutdown(Shutdown::Both);
        }
        self.pending.clear();
        self.eof = true;
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

impl Drop for TlsStream {
    fn drop(&mut self) {
        self.close();
    }
}
