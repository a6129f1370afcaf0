//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! departures-config.toml file. It provides a centralized way to configure the
//! upstream feed, the stop being watched, the timing budgets of an
//! acquisition cycle and the host loop's refresh behaviour.
//!
//! Every section and field has a default, so a partial file only needs to
//! name what differs (typically just `[feed] stop_id`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "departures-config.toml";

/// Application configuration loaded from departures-config.toml
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Upstream feed and stop selection
    pub feed: FeedConfig,
    /// Retry and timeout budgets for one acquisition cycle
    pub timing: TimingConfig,
    /// Host loop refresh and cache settings
    pub board: BoardConfig,
}

/// Upstream departures feed configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Host serving the departures pages
    pub host: String,
    /// TLS port
    pub port: u16,
    /// ATCO code of the stop (e.g., "340000004H3")
    pub stop_id: String,
    /// Long stop name; looked up from the feed when absent
    pub stop_name: Option<String>,
    /// Comma-separated list of services to show; empty shows all
    pub filter: String,
}

/// Timing budgets for the connection controller and the body read
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Connection attempts before giving up
    pub connect_attempts: u32,
    /// Pause between connection attempts
    pub connect_retry_delay_ms: u64,
    /// Polls for the first response byte before giving up
    pub response_attempts: u32,
    /// Pause between first-byte polls
    pub response_poll_delay_ms: u64,
    /// Per-call socket read timeout
    pub read_timeout_ms: u64,
    /// Overall deadline for reading and parsing the body
    pub body_deadline_secs: u64,
    /// Minimum interval between host progress callbacks
    pub progress_interval_ms: u64,
    /// Pause between read batches of the stop lookup
    pub lookup_poll_delay_ms: u64,
}

/// Host loop configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Normal refresh interval
    pub refresh_secs: u64,
    /// Back-off after a data error or timeout
    pub error_backoff_secs: u64,
    /// Where the last committed board is cached
    pub cache_path: PathBuf,
    /// Cached boards older than this are ignored on startup
    pub cache_ttl_minutes: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            host: "bustimes.org".to_string(),
            port: 443,
            stop_id: String::new(),
            stop_name: None,
            filter: String::new(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            connect_attempts: 15,
            connect_retry_delay_ms: 200,
            response_attempts: 40,
            response_poll_delay_ms: 200,
            read_timeout_ms: 15_000,
            body_deadline_secs: 10,
            progress_interval_ms: 800,
            lookup_poll_delay_ms: 25,
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            refresh_secs: 45,
            error_backoff_secs: 30,
            cache_path: PathBuf::from("/tmp/departures_cache.json"),
            cache_ttl_minutes: 30,
        }
    }
}

impl TimingConfig {
    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }

    pub fn response_poll_delay(&self) -> Duration {
        Duration::from_millis(self.response_poll_delay_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn body_deadline(&self) -> Duration {
        Duration::from_secs(self.body_deadline_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn lookup_poll_delay(&self) -> Duration {
        Duration::from_millis(self.lookup_poll_delay_ms)
    }
}

impl Config {
    /// Load configuration from departures-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        stop = %config.feed.stop_id,
                        "Loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), "Invalid config file format: {}", e);
                    warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "No config file found, using default configuration");
                Self::default()
            }
        }
    }
}
