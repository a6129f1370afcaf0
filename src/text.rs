//! # Bounded Text Fields
//!
//! Every text field on the board has a hard upper length. The display only
//! has room for so many characters and the scraper must never let one long
//! line from the upstream page grow a record without limit.
//!
//! [`BoundedText`] wraps a `String` and a const-generic maximum length `N`
//! (counted in characters). All writes go through [`BoundedText::set`], which
//! truncates on a character boundary, so the value is always valid UTF-8 and
//! never longer than `N` characters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Text value holding at most `N` characters.
///
/// # Example
/// ```
/// use departures_board_lib::text::BoundedText;
///
/// let mut line: BoundedText<4> = BoundedText::new("X5");
/// assert_eq!(line.as_str(), "X5");
///
/// line.set("Oxford");
/// assert_eq!(line.as_str(), "Oxfo");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BoundedText<const N: usize> {
    text: String,
}

impl<const N: usize> BoundedText<N> {
    /// Maximum number of characters this field can hold.
    pub const MAX_CHARS: usize = N;

    /// Create a value from `text`, truncating it to `N` characters.
    pub fn new(text: &str) -> Self {
        Self {
            text: truncate_chars(text, N).to_string(),
        }
    }

    /// Replace the contents, truncating to `N` characters.
    pub fn set(&mut self, text: &str) {
        self.text.clear();
        self.text.push_str(truncate_chars(text, N));
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Replace every occurrence of `target` with `replacement` in place.
    ///
    /// The result is re-truncated to `N`, so a replacement longer than its
    /// target cannot push the value over its bound.
    pub fn replace_all(&mut self, target: &str, replacement: &str) {
        if target.is_empty() || !self.text.contains(target) {
            return;
        }
        let replaced = self.text.replace(target, replacement);
        self.set(&replaced);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Return the longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

impl<const N: usize> fmt::Debug for BoundedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.text, f)
    }
}

impl<const N: usize> fmt::Display for BoundedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl<const N: usize> PartialEq<str> for BoundedText<N> {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl<const N: usize> PartialEq<&str> for BoundedText<N> {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl<const N: usize> Serialize for BoundedText<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

// Cached or hand-edited data goes back through truncation on load.
impl<'de, const N: usize> Deserialize<'de> for BoundedText<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::new(&text))
    }
}
