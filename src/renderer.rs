//! # Departures Board Rendering
//!
//! Renders the committed board as plain text for terminal output. The layout
//! follows a physical departures board: the stop name on top, one row per
//! service underneath and a status footer.

use crate::report::UpdateOutcome;
use crate::{BoardSnapshot, ServiceRecord, MAX_LINE_CHARS, MAX_LOCATION_CHARS};
use chrono::{DateTime, Local};
use std::fmt::Write;

const EMPTY_BOARD: &str = "No scheduled services";

/// Departure column text: `Exp 14:35` when a live estimate is present,
/// otherwise the timetabled time.
///
/// Upstream marks live estimates with a leading digit. Anything else in the
/// expected column ("Due", "Cancelled", blank) falls back to the timetable.
pub fn departure_label(service: &ServiceRecord) -> String {
    let live = service
        .expected
        .as_str()
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit());
    if live {
        format!("Exp {}", service.expected)
    } else {
        service.scheduled.to_string()
    }
}

/// Full board text as it would be drawn.
pub fn format_board(
    stop_name: &str,
    board: &BoardSnapshot,
    outcome: Option<UpdateOutcome>,
    updated: DateTime<Local>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{stop_name}");
    let _ = writeln!(out, "{}", "=".repeat(stop_name.chars().count().max(1)));

    if board.is_empty() {
        let _ = writeln!(out, "{EMPTY_BOARD}");
    }
    for service in board.services() {
        let _ = writeln!(
            out,
            "{:<line$}  {:<dest$}  {}",
            service.identifier.as_str(),
            service.destination.as_str(),
            departure_label(service),
            line = MAX_LINE_CHARS,
            dest = MAX_LOCATION_CHARS,
        );
    }

    let _ = write!(out, "\nUpdated {}", updated.format("%H:%M:%S"));
    if let Some(outcome) = outcome {
        let _ = write!(out, "  {outcome}");
    }
    out.push('\n');
    out
}

/// Print the board to stdout.
pub fn draw_ascii(stop_name: &str, board: &BoardSnapshot, outcome: Option<UpdateOutcome>) {
    print!("{}", format_board(stop_name, board, outcome, Local::now()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn service(id: &str, destination: &str, scheduled: &str, expected: &str) -> ServiceRecord {
        let mut record = ServiceRecord::default();
        record.identifier.set(id);
        record.destination.set(destination);
        record.scheduled.set(scheduled);
        record.expected.set(expected);
        record
    }

    fn at_half_two() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 14, 30, 5).unwrap()
    }

    #[test]
    fn test_departure_label_prefers_live_estimate() {
        assert_eq!(departure_label(&service("X5", "Oxford", "14:32", "14:35")), "Exp 14:35");
    }

    #[test]
    fn test_departure_label_falls_back_to_scheduled() {
        assert_eq!(departure_label(&service("X5", "Oxford", "14:32", "")), "14:32");
        assert_eq!(departure_label(&service("X5", "Oxford", "14:32", "Due")), "14:32");
    }

    #[test]
    fn test_format_board_lists_services_in_order() {
        let mut board = BoardSnapshot::new();
        board.push(service("X5", "Oxford", "14:32", "14:35"));
        board.push(service("280", "Aylesbury", "14:40", ""));

        let text = format_board(
            "Gloucester Green",
            &board,
            Some(UpdateOutcome::Success),
            at_half_two(),
        );
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Gloucester Green");
        assert!(lines[2].starts_with("X5 "));
        assert!(lines[2].contains("Oxford"));
        assert!(lines[2].ends_with("Exp 14:35"));
        assert!(lines[3].starts_with("280 "));
        assert!(lines[3].ends_with("14:40"));
        assert_eq!(lines.last().copied(), Some("Updated 14:30:05  SUCCESS"));
    }

    #[test]
    fn test_format_empty_board() {
        let text = format_board("Market Square", &BoardSnapshot::new(), None, at_half_two());
        assert!(text.contains(EMPTY_BOARD));
        assert!(text.ends_with("Updated 14:30:05\n"));
    }

    #[test]
    fn test_draw_ascii_does_not_panic() {
        let mut board = BoardSnapshot::new();
        board.push(service("N1", "Railway Station", "01:15", ""));
        draw_ascii("Night Stop", &board, Some(UpdateOutcome::NoChange));
    }
}
