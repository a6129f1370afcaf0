//! # Departures Acquisition Client
//!
//! One call to [`BusDataClient::update_departures`] is one acquisition cycle:
//! connect, request the stop's departures page, scrape it, diff it against
//! the caller's board and commit. The cycle runs synchronously to the end
//! and always returns an [`UpdateReport`]; nothing is thrown past it.
//!
//! ## Time Budget
//! Socket reads can block up to the configured read timeout, but the body
//! phase as a whole is bounded by `body_deadline_secs` (10 s by default).
//! The deadline is checked before every line, however fast data arrives.
//! If it passes before `</body>` is seen or the board fills up, or while the
//! read that finished the document was still blocked, the partial board is
//! dropped and the caller keeps the previous one.
//!
//! ## Host Progress
//! Parsing a long page on a slow link can take several seconds. The host
//! passes a [`ProgressHook`] that is called at most once per
//! `progress_interval_ms` while the body is read, so a single-threaded host
//! can keep its clock ticking.

use crate::config::TimingConfig;
use crate::error::FeedError;
use crate::filter::CompiledFilter;
use crate::http::{self, Request};
use crate::lookup::{LongNameExtractor, LookupBody};
use crate::report::{UpdateOutcome, UpdateReport};
use crate::scraper::{ScrapeProgress, TableScraper};
use crate::stream::SecureStream;
use crate::{BoardSnapshot, BoardState, LocationName};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Callback invoked periodically while a body is being read.
///
/// Must return quickly. Any `FnMut()` closure is a hook.
pub trait ProgressHook {
    fn tick(&mut self);
}

impl<F: FnMut()> ProgressHook for F {
    fn tick(&mut self) {
        self()
    }
}

/// Hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressHook for NoProgress {
    fn tick(&mut self) {}
}

/// Result of a stop lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopLookup {
    pub report: UpdateReport,
    pub long_name: Option<LocationName>,
}

/// Client for the bus departures feed.
pub struct BusDataClient<S: SecureStream> {
    stream: S,
    host: String,
    port: u16,
    timing: TimingConfig,
}

/// Paces the progress hook.
struct Ticker<'h> {
    hook: &'h mut dyn ProgressHook,
    interval: Duration,
    next: Instant,
}

impl<'h> Ticker<'h> {
    fn new(hook: &'h mut dyn ProgressHook, interval: Duration) -> Self {
        Self {
            hook,
            interval,
            next: Instant::now() + interval,
        }
    }

    fn tick_now(&mut self) {
        self.hook.tick();
        self.next = Instant::now() + self.interval;
    }

    fn maybe_tick(&mut self) {
        if Instant::now() >= self.next {
            self.tick_now();
        }
    }
}

impl<S: SecureStream> BusDataClient<S> {
    pub fn new(stream: S, host: impl Into<String>, port: u16, timing: TimingConfig) -> Self {
        Self {
            stream,
            host: host.into(),
            port,
            timing,
        }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Run one acquisition cycle for `stop_id` and commit into `state`.
    ///
    /// `state` is only written when the page was read to a structural end
    /// (`</body>` or a full board).
    pub fn update_departures(
        &mut self,
        state: &mut BoardState,
        stop_id: &str,
        filter: &CompiledFilter,
        hook: &mut dyn ProgressHook,
    ) -> UpdateReport {
        let started = Instant::now();
        match self.fetch_board(stop_id, filter, hook) {
            Ok(fetched) => {
                let changed = state.commit(fetched.board);
                let report =
                    UpdateReport::committed(changed, started.elapsed(), fetched.bytes, fetched.chunked);
                info!(
                    stop = stop_id,
                    services = state.board().len(),
                    changed,
                    "{}",
                    report.message
                );
                report
            }
            Err(e) => {
                let report = UpdateReport::failed(&e);
                warn!(stop = stop_id, outcome = %report.outcome, "{}", report.message);
                report
            }
        }
    }

    fn fetch_board(
        &mut self,
        stop_id: &str,
        filter: &CompiledFilter,
        hook: &mut dyn ProgressHook,
    ) -> Result<FetchedBoard, FeedError> {
        let request = Request {
            host: &self.host,
            port: self.port,
            path: format!("/stops/{stop_id}/departures"),
            missing_is_data_error: false,
        };
        let head = http::open(&mut self.stream, &request, &self.timing)?;

        let mut ticker = Ticker::new(hook, self.timing.progress_interval());
        ticker.tick_now();

        let deadline = Instant::now() + self.timing.body_deadline();
        let mut scraper = TableScraper::new(filter);
        let mut bytes = 0usize;

        while (self.stream.available() || self.stream.connected())
            && Instant::now() < deadline
            && !scraper.is_complete()
        {
            while self.stream.available() && !scraper.is_complete() && Instant::now() < deadline {
                let line = self.stream.read_line_until(b'\n');
                bytes += line.len() + 1;
                if scraper.feed_line(&line) == ScrapeProgress::Complete {
                    break;
                }
                ticker.maybe_tick();
            }
            ticker.maybe_tick();
        }
        // A blocking read may finish the document after the deadline has passed
        let overran = Instant::now() >= deadline;
        self.stream.close();

        if overran {
            debug!(bytes, services = scraper.len(), "Body deadline passed");
            return Err(FeedError::Timeout { bytes });
        }
        if !scraper.is_complete() {
            return Err(FeedError::DataError(
                "Response ended before end of document".to_string(),
            ));
        }

        let board = scraper.finish().unwrap_or_default();
        debug!(bytes, services = board.len(), "Board scraped");
        Ok(FetchedBoard {
            board,
            bytes,
            chunked: head.chunked,
        })
    }

    /// Resolve a stop's long display name from the lookup endpoint.
    pub fn stop_long_name(&mut self, stop_id: &str) -> StopLookup {
        let started = Instant::now();
        match self.fetch_long_name(stop_id) {
            Ok((long_name, bytes, chunked)) => {
                if long_name.is_none() {
                    warn!(stop = stop_id, "Lookup response had no long name");
                }
                let mut message = String::new();
                if chunked {
                    message.push_str("WARNING: Chunked response! ");
                }
                message.push_str(&format!(
                    "SUCCESS Update took: {}ms [{bytes}]",
                    started.elapsed().as_millis()
                ));
                info!(stop = stop_id, name = ?long_name, "{}", message);
                StopLookup {
                    report: UpdateReport {
                        outcome: UpdateOutcome::Success,
                        message,
                    },
                    long_name,
                }
            }
            Err(e) => {
                let report = UpdateReport::failed(&e);
                warn!(stop = stop_id, outcome = %report.outcome, "{}", report.message);
                StopLookup {
                    report,
                    long_name: None,
                }
            }
        }
    }

    fn fetch_long_name(
        &mut self,
        stop_id: &str,
    ) -> Result<(Option<LocationName>, usize, bool), FeedError> {
        let request = Request {
            host: &self.host,
            port: self.port,
            path: format!("/api/stops/{stop_id}"),
            missing_is_data_error: true,
        };
        let head = http::open(&mut self.stream, &request, &self.timing)?;

        let deadline = Instant::now() + self.timing.body_deadline();
        let mut body = LookupBody::new(LongNameExtractor::default());
        let mut bytes = 0usize;

        while !body.is_document_complete()
            && (self.stream.available() || self.stream.connected())
            && Instant::now() < deadline
        {
            while self.stream.available() && !body.is_document_complete() && Instant::now() < deadline
            {
                let Some(byte) = self.stream.read_byte() else {
                    break;
                };
                bytes += 1;
                body.feed(byte);
            }
            if !body.is_document_complete() {
                thread::sleep(self.timing.lookup_poll_delay());
            }
        }
        let overran = !body.is_document_complete() && Instant::now() >= deadline;
        self.stream.close();

        if overran {
            return Err(FeedError::Timeout { bytes });
        }
        if !body.is_structurally_complete() {
            return Err(FeedError::Incomplete);
        }
        Ok((body.into_extractor().into_location_name(), bytes, head.chunked))
    }
}

struct FetchedBoard {
    board: BoardSnapshot,
    bytes: usize,
    chunked: bool,
}
