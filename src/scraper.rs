//! # Departures Table Scraper
//!
//! The departures page is plain server-rendered HTML with one element per
//! line and no schema we can rely on. Rather than build a DOM, the scraper
//! walks the body line by line through a small state machine and rebuilds
//! each table row into a [`ServiceRecord`].
//!
//! ## Expected Markup
//! ```html
//! <table>
//!   <tr>
//!     <th>Service</th>
//!     <th>To</th>
//!     <th>Scheduled</th>
//!     <th>Expected</th>
//!     <th></th>
//!   </tr>
//!   <tr>
//!     <td>
//!       <a href="/services/x5-oxford">X5</a>
//!     </td>
//!     <td>
//!       Oxford
//!     </td>
//!     <td>
//!       14:32
//!     </td>
//!     <td>
//!       14:35
//!     </td>
//!   </tr>
//! </table>
//! </body>
//! ```
//!
//! ## States
//! ```text
//! SeekingTable --<tr>--> Header --</tr>--> Identifier --</td>--> Destination
//!      ^                   ^                   |                     |
//!      +----</table>-------|-------------------+                  </td>
//!                          |                                         v
//!                          +-- row done <-- Expected <--</td>-- Scheduled
//!                          +-- row done (no expected column) <------+
//! ```
//! The header row is counted once per table: more than four header cells
//! means the page carries an expected-time column. `</body>` ends the parse
//! from any state, as does filling the board to capacity.

use crate::filter::CompiledFilter;
use crate::{BoardSnapshot, ServiceRecord};
use tracing::{debug, trace};

const ROW_START: &str = "<tr>";
const ROW_END: &str = "</tr>";
const CELL_START: &str = "<td";
const HEADER_CELL_START: &str = "<th";
const CELL_END: &str = "</td>";
const LINK_START: &str = "<a href";
const TABLE_END: &str = "</table>";
const DOCUMENT_END: &str = "</body>";

/// Header cell count at which the expected-time column is present.
const COLUMNS_WITH_EXPECTED: usize = 5;

/// Where in the row grammar the scraper currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserState {
    SeekingTableStart,
    InHeader,
    InRecordIdentifier,
    InDestination,
    InScheduledTime,
    InExpectedTime,
}

/// Result of feeding one line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrapeProgress {
    /// Keep feeding lines
    Continue,
    /// End of document seen or board full; stop reading
    Complete,
}

/// Line-driven scraper for one departures page.
#[derive(Debug)]
pub struct TableScraper<'f> {
    filter: &'f CompiledFilter,
    state: ParserState,
    /// Cells in the current table's header row, once it has been read
    columns: Option<usize>,
    header_cells: usize,
    in_cell: bool,
    current: ServiceRecord,
    board: BoardSnapshot,
    complete: bool,
}

impl<'f> TableScraper<'f> {
    pub fn new(filter: &'f CompiledFilter) -> Self {
        Self {
            filter,
            state: ParserState::SeekingTableStart,
            columns: None,
            header_cells: 0,
            in_cell: false,
            current: ServiceRecord::default(),
            board: BoardSnapshot::new(),
            complete: false,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Records accepted so far.
    pub fn len(&self) -> usize {
        self.board.len()
    }

    pub fn is_empty(&self) -> bool {
        self.board.is_empty()
    }

    /// Feed one raw body line (with or without its line ending).
    pub fn feed_line(&mut self, raw: &str) -> ScrapeProgress {
        if self.complete {
            return ScrapeProgress::Complete;
        }
        let line = raw.trim();
        if line.is_empty() {
            return ScrapeProgress::Continue;
        }
        if line.contains(DOCUMENT_END) {
            debug!(services = self.board.len(), "End of document");
            self.complete = true;
            return ScrapeProgress::Complete;
        }

        match self.state {
            ParserState::SeekingTableStart => {
                if line.contains(ROW_START) {
                    self.header_cells = 0;
                    self.transition(ParserState::InHeader);
                }
            }
            ParserState::InHeader => {
                if line.contains(ROW_END) {
                    if self.columns.is_none() {
                        debug!(columns = self.header_cells, "Header row read");
                        self.columns = Some(self.header_cells);
                    }
                    self.in_cell = false;
                    self.transition(ParserState::InRecordIdentifier);
                } else if self.columns.is_none()
                    && (line.starts_with(HEADER_CELL_START) || line.starts_with(CELL_START))
                {
                    self.header_cells += 1;
                }
            }
            ParserState::InRecordIdentifier => {
                if line.contains(TABLE_END) {
                    // Another day's table may follow with its own header
                    self.columns = None;
                    self.current = ServiceRecord::default();
                    self.transition(ParserState::SeekingTableStart);
                } else if line.contains(CELL_END) {
                    self.transition(ParserState::InDestination);
                } else if line.starts_with(CELL_START) {
                    self.in_cell = true;
                } else if line.starts_with(LINK_START) {
                    if self.in_cell {
                        self.current.identifier.set(&strip_tag(line));
                    }
                } else if !is_markup(line) {
                    self.current.identifier.set(line);
                }
            }
            ParserState::InDestination => {
                if line.contains(CELL_END) {
                    self.transition(ParserState::InScheduledTime);
                } else if !is_markup(line) {
                    self.current.destination.set(line);
                }
            }
            ParserState::InScheduledTime => {
                if line.contains(CELL_END) {
                    if self.has_expected_column() {
                        self.transition(ParserState::InExpectedTime);
                    } else {
                        self.current.expected.clear();
                        self.finish_record();
                    }
                } else if !is_markup(line) {
                    self.current.scheduled.set(line);
                }
            }
            ParserState::InExpectedTime => {
                if line.contains(CELL_END) {
                    self.finish_record();
                } else if !is_markup(line) {
                    self.current.expected.set(line);
                }
            }
        }

        if self.complete {
            ScrapeProgress::Complete
        } else {
            ScrapeProgress::Continue
        }
    }

    /// Hand back the board if the parse completed, applying the `&amp;`
    /// unescape to every destination. An unfinished parse yields `None`.
    pub fn finish(self) -> Option<BoardSnapshot> {
        if !self.complete {
            return None;
        }
        let mut board = self.board;
        for service in board.services_mut() {
            service.destination.replace_all("&amp;", "&");
        }
        Some(board)
    }

    fn has_expected_column(&self) -> bool {
        self.columns.unwrap_or(0) >= COLUMNS_WITH_EXPECTED
    }

    fn finish_record(&mut self) {
        let record = std::mem::take(&mut self.current);
        if self.filter.matches(record.identifier.as_str()) {
            trace!(service = %record.identifier, "Service accepted");
            self.board.push(record);
            if self.board.is_full() {
                debug!(services = self.board.len(), "Board full");
                self.complete = true;
            }
        } else {
            trace!(service = %record.identifier, "Service filtered out");
        }
        self.transition(ParserState::InHeader);
    }

    fn transition(&mut self, next: ParserState) {
        trace!(from = ?self.state, to = ?next, "Scraper transition");
        self.state = next;
    }
}

fn is_markup(line: &str) -> bool {
    line.starts_with('<')
}

/// Text between the first `>` and the following `</`, trimmed.
///
/// `<a href="/services/x5">X5</a>` gives `X5`; lines without that shape
/// give an empty string.
pub fn strip_tag(line: &str) -> String {
    let Some(open) = line.find('>') else {
        return String::new();
    };
    let inner = &line[open + 1..];
    match inner.find("</") {
        Some(close) => inner[..close].trim().to_string(),
        None => String::new(),
    }
}
