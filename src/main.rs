//! # Departures Board Application Entry Point
//!
//! Runs the board's host loop: resolve the stop name once, then run an
//! acquisition cycle every refresh interval, redraw the terminal board when
//! the primary services change and back off or stop according to each
//! cycle's outcome.

use anyhow::{bail, Context};
use clap::Parser;
use departures_board_lib::client::BusDataClient;
use departures_board_lib::config::{Config, DEFAULT_CONFIG_PATH};
use departures_board_lib::filter::CompiledFilter;
use departures_board_lib::report::{UpdateOutcome, UpdateReport};
use departures_board_lib::stream::TlsStream;
use departures_board_lib::{cache, renderer::draw_ascii, BoardState};
use std::path::PathBuf;
use std::thread;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Live bus departures for a single stop, rendered to the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop ATCO code, overriding the config file
    #[arg(long)]
    stop: Option<String>,

    /// Comma-separated services to show, overriding the config file
    #[arg(long)]
    filter: Option<String>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("departures_board=info,departures_board_lib=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit status for `--once`: only a committed cycle counts as success.
fn single_cycle_result(report: &UpdateReport) -> anyhow::Result<()> {
    if !report.outcome.is_committed() {
        bail!("{}", report);
    }
    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = Config::load_from_path(&args.config);
    if let Some(stop) = args.stop {
        config.feed.stop_id = stop;
    }
    if let Some(filter) = args.filter {
        config.feed.filter = filter;
    }
    if config.feed.stop_id.is_empty() {
        bail!(
            "No stop configured: set [feed] stop_id in {} or pass --stop",
            args.config.display()
        );
    }

    let filter = CompiledFilter::compile(&config.feed.filter);
    let stream = TlsStream::new().context("initialise TLS")?;
    let mut client = BusDataClient::new(
        stream,
        config.feed.host.clone(),
        config.feed.port,
        config.timing.clone(),
    );
    let stop_id = config.feed.stop_id.clone();

    let stop_name = match config.feed.stop_name.clone() {
        Some(name) => name,
        None => {
            let lookup = client.stop_long_name(&stop_id);
            if lookup.report.outcome == UpdateOutcome::Unauthorized {
                bail!("{}", lookup.report);
            }
            lookup
                .long_name
                .map(|name| name.to_string())
                .unwrap_or_else(|| stop_id.clone())
        }
    };
    info!(stop = %stop_id, name = %stop_name, filter = %filter, "Watching stop");

    // Seed from the last board so the first cycle diffs against it
    let mut state = match cache::load(&config.board.cache_path, &stop_id, config.board.cache_ttl_minutes) {
        Ok(board) => {
            info!(services = board.len(), "Restored board from cache");
            draw_ascii(&stop_name, &board, None);
            BoardState::with_board(board)
        }
        Err(e) => {
            debug!("No usable cached board: {}", e);
            BoardState::new()
        }
    };

    let mut first_load = true;
    let mut progress = || debug!("Still reading departures");
    loop {
        let report = client.update_departures(&mut state, &stop_id, &filter, &mut progress);

        if report.outcome.is_committed() {
            if let Err(e) = cache::save(&config.board.cache_path, &stop_id, state.board()) {
                warn!("Failed to cache board: {}", e);
            }
            let redraw = report.outcome == UpdateOutcome::Success
                || (report.outcome == UpdateOutcome::NoChange && first_load);
            if redraw {
                draw_ascii(&stop_name, state.board(), Some(report.outcome));
            }
            first_load = false;
        }

        let Some(wait) = report.outcome.next_poll(&config.board) else {
            bail!("{}", report);
        };
        if args.once {
            return single_cycle_result(&report);
        }
        debug!(secs = wait.as_secs(), "Next cycle");
        thread::sleep(wait);
    }
}
