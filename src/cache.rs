//! # Board Cache
//!
//! Keeps the last committed board on disk so a restarted board can show
//! something straight away and diff its first cycle against what was on
//! screen before.
//!
//! - **Location**: `/tmp/departures_cache.json` by default (cleared on reboot)
//! - **Format**: JSON with the stop id and a UTC save timestamp
//! - **TTL**: 30 minutes; older entries are ignored
//!
//! Only the immediately previous board is kept, never a history.

use crate::BoardSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error;

/// Errors reading or writing the board cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache IO: {0}")]
    Io(#[from] io::Error),

    #[error("cache format: {0}")]
    Format(#[from] serde_json::Error),

    #[error("cached board is stale")]
    Stale,

    #[error("cached board belongs to stop {0}")]
    OtherStop(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedBoard {
    stop_id: String,
    saved_at: DateTime<Utc>,
    board: BoardSnapshot,
}

/// Load the cached board for `stop_id` if it is younger than `ttl_minutes`.
pub fn load(path: &Path, stop_id: &str, ttl_minutes: u64) -> Result<BoardSnapshot, CacheError> {
    load_at(path, stop_id, ttl_minutes, Utc::now())
}

fn load_at(
    path: &Path,
    stop_id: &str,
    ttl_minutes: u64,
    now: DateTime<Utc>,
) -> Result<BoardSnapshot, CacheError> {
    let data = fs::read(path)?;
    let cached: CachedBoard = serde_json::from_slice(&data)?;

    if cached.stop_id != stop_id {
        return Err(CacheError::OtherStop(cached.stop_id));
    }
    let age_secs = (now - cached.saved_at).num_seconds();
    if u64::try_from(age_secs).is_ok_and(|age| age > ttl_minutes.saturating_mul(60)) {
        return Err(CacheError::Stale);
    }
    Ok(cached.board)
}

/// Save `board` as the cached board for `stop_id`.
pub fn save(path: &Path, stop_id: &str, board: &BoardSnapshot) -> Result<(), CacheError> {
    save_at(path, stop_id, board, Utc::now())
}

fn save_at(
    path: &Path,
    stop_id: &str,
    board: &BoardSnapshot,
    now: DateTime<Utc>,
) -> Result<(), CacheError> {
    let cached = CachedBoard {
        stop_id: stop_id.to_string(),
        saved_at: now,
        board: board.clone(),
    };
    fs::write(path, serde_json::to_vec(&cached)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceRecord;
    use chrono::Duration;
    use tempfile::NamedTempFile;

    /// Test helper: a one-service board
    fn sample_board() -> BoardSnapshot {
        let mut record = ServiceRecord::default();
        record.identifier.set("X5");
        record.destination.set("Oxford");
        record.scheduled.set("14:32");
        let mut board = BoardSnapshot::new();
        board.push(record);
        board
    }

    #[test]
    fn test_cache_roundtrip() {
        let temp_file = NamedTempFile::new().unwrap();
        let board = sample_board();

        save(temp_file.path(), "340000004H3", &board).unwrap();
        let loaded = load(temp_file.path(), "340000004H3", 30).unwrap();

        assert_eq!(loaded, board);
    }

    #[test]
    fn test_stale_cache_is_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        let saved = Utc::now() - Duration::minutes(31);
        save_at(temp_file.path(), "340000004H3", &sample_board(), saved).unwrap();

        let err = load(temp_file.path(), "340000004H3", 30).unwrap_err();
        assert!(matches!(err, CacheError::Stale));
    }

    #[test]
    fn test_other_stop_is_rejected() {
        let temp_file = NamedTempFile::new().unwrap();
        save(temp_file.path(), "340000004H3", &sample_board()).unwrap();

        let err = load(temp_file.path(), "0100BRP90312", 30).unwrap_err();
        assert!(matches!(err, CacheError::OtherStop(stop) if stop == "340000004H3"));
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), b"{not json").unwrap();
        assert!(matches!(
            load(temp_file.path(), "340000004H3", 30),
            Err(CacheError::Format(_))
        ));
    }

    #[test]
    fn test_missing_cache_is_an_io_error() {
        let err = load(Path::new("/nonexistent/departures.json"), "x", 30).unwrap_err();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
