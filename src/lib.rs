//! # Departures Board Core Library
//!
//! This library provides the acquisition-and-extraction engine behind a small
//! bus departures board. It fetches the live departures page for a single
//! stop over TLS, scrapes a bounded set of service records out of the
//! loosely-structured markup line by line, and decides whether the result is
//! worth a redraw.
//!
//! ## Design Philosophy
//!
//! ### Bounded Everything
//! - **Fixed capacity**: A board never holds more than [`MAX_BOARD_SERVICES`]
//!   records, however many rows the upstream page contains
//! - **Bounded text**: Every field is a [`text::BoundedText`] with an explicit
//!   character limit
//! - **Bounded time**: Connection attempts, the first-byte wait and the body
//!   read each have their own budget (see [`config::TimingConfig`])
//!
//! ### Data Flow
//! 1. **Connect**: [`http::open`] connects with retries, sends a minimal
//!    `GET`, classifies the status line and skips the headers
//! 2. **Scrape**: [`scraper::TableScraper`] turns body lines into records,
//!    applying the stop's [`filter::CompiledFilter`]
//! 3. **Diff**: [`differ::board_changed`] compares against the previous board
//! 4. **Commit**: [`BoardState`] is replaced only after a structurally
//!    complete parse
//! 5. **Report**: every path ends in a [`report::UpdateReport`]
//!
//! ## Core Types
//! - [`ServiceRecord`]: one upcoming departure
//! - [`BoardSnapshot`]: the capacity-bounded records of one cycle
//! - [`BoardState`]: the caller-owned board that survives across cycles

use serde::{Deserialize, Serialize};

pub mod cache;
pub mod client;
pub mod config;
pub mod differ;
pub mod error;
pub mod filter;
pub mod http;
pub mod json;
pub mod lookup;
pub mod renderer;
pub mod report;
pub mod scraper;
pub mod stream;
pub mod text;

#[cfg(test)]
pub(crate) mod testutil;


use text::BoundedText;

/// Maximum number of services held on a board.
pub const MAX_BOARD_SERVICES: usize = 9;
/// Maximum characters in a service identifier (line name).
pub const MAX_LINE_CHARS: usize = 8;
/// Maximum characters in a destination or stop name.
pub const MAX_LOCATION_CHARS: usize = 44;
/// Maximum characters in a departure time ("14:32").
pub const MAX_TIME_CHARS: usize = 5;

/// Destination shown until the page supplies one.
pub const DEFAULT_DESTINATION: &str = "Check front of bus";

pub type LineName = BoundedText<MAX_LINE_CHARS>;
pub type LocationName = BoundedText<MAX_LOCATION_CHARS>;
pub type DepartureTime = BoundedText<MAX_TIME_CHARS>;

/// One upcoming departure.
///
/// # Example
/// ```
/// use departures_board_lib::ServiceRecord;
///
/// let mut record = ServiceRecord::default();
/// assert_eq!(record.destination.as_str(), "Check front of bus");
///
/// record.identifier.set("X5");
/// record.scheduled.set("14:32");
/// assert!(record.expected.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Line name, e.g. "X5"
    pub identifier: LineName,
    /// Where the bus is heading
    pub destination: LocationName,
    /// Timetabled departure, e.g. "14:32"
    pub scheduled: DepartureTime,
    /// Live estimate; empty when the stop has no real-time column
    pub expected: DepartureTime,
}

impl Default for ServiceRecord {
    fn default() -> Self {
        Self {
            identifier: LineName::default(),
            destination: LocationName::new(DEFAULT_DESTINATION),
            scheduled: DepartureTime::default(),
            expected: DepartureTime::default(),
        }
    }
}

/// Ordered, capacity-bounded set of records produced by one acquisition cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    services: Vec<ServiceRecord>,
}

impl BoardSnapshot {
    pub fn new() -> Self {
        Self {
            services: Vec::with_capacity(MAX_BOARD_SERVICES),
        }
    }

    /// Append a record. Returns `false` (and drops the record) when full.
    pub fn push(&mut self, record: ServiceRecord) -> bool {
        if self.is_full() {
            return false;
        }
        self.services.push(record);
        true
    }

    pub fn is_full(&self) -> bool {
        self.services.len() >= MAX_BOARD_SERVICES
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn services(&self) -> &[ServiceRecord] {
        &self.services
    }

    pub(crate) fn services_mut(&mut self) -> &mut [ServiceRecord] {
        &mut self.services
    }
}

/// Caller-owned board that outlives a single acquisition cycle.
///
/// Only [`client::BusDataClient::update_departures`] writes to it, and only
/// after a structurally complete parse. After a failed cycle it still holds
/// the previous board, including the previous `changed` flag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoardState {
    board: BoardSnapshot,
    changed: bool,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the state with a previously committed board (e.g. from cache).
    pub fn with_board(board: BoardSnapshot) -> Self {
        Self {
            board,
            changed: false,
        }
    }

    pub fn board(&self) -> &BoardSnapshot {
        &self.board
    }

    /// True when the last committed cycle materially changed the board.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Replace the board with `next`, recording whether it changed.
    pub(crate) fn commit(&mut self, next: BoardSnapshot) -> bool {
        self.changed = differ::board_changed(next.services(), self.board.services());
        self.board = next;
        self.changed
    }
}
