//! Change detection between two boards.
//!
//! A redraw is only worth it when the headline services move. Boards with a
//! different number of services always count as changed; otherwise only the
//! first two records are compared (identifier and destination). A change
//! confined to the third record or later is not reported.

use crate::ServiceRecord;

/// Number of leading records compared when counts are equal.
pub const COMPARED_SERVICES: usize = 2;

/// Decide whether `new` differs materially from `old`.
pub fn board_changed(new: &[ServiceRecord], old: &[ServiceRecord]) -> bool {
    if new.len() != old.len() {
        return true;
    }
    new.iter()
        .zip(old)
        .take(COMPARED_SERVICES)
        .any(|(a, b)| a.identifier != b.identifier || a.destination != b.destination)
}
