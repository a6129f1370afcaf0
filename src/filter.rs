//! # Service Filter
//!
//! Users can restrict the board to a handful of lines with a comma-separated
//! allow-list such as `"X5, 280,s5"`. The raw list is compiled once when the
//! configuration changes and then matched against every scraped row.
//!
//! Compilation strips whitespace, lower-cases letters and keeps the commas.
//! An empty compiled filter means "show every service".

use std::fmt;

/// Canonical form of a raw comma-separated allow-list.
///
/// # Example
/// ```
/// use departures_board_lib::filter::CompiledFilter;
///
/// let filter = CompiledFilter::compile(" X5 , 280");
/// assert_eq!(filter.render(), "x5,280");
/// assert!(filter.matches("x5"));
/// assert!(!filter.matches("S5"));
///
/// assert!(CompiledFilter::compile("").matches("anything"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledFilter {
    canonical: String,
}

impl CompiledFilter {
    /// Compile a raw allow-list. Compiling an already compiled filter's
    /// [`render`](Self::render) output yields the same filter.
    pub fn compile(raw: &str) -> Self {
        let canonical = raw
            .chars()
            .filter(|c| *c == ',' || !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        Self { canonical }
    }

    /// The "accept everything" filter.
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn is_accept_all(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn render(&self) -> &str {
        &self.canonical
    }

    /// True if `identifier` is one of the listed services (or the filter is empty).
    pub fn matches(&self, identifier: &str) -> bool {
        if self.is_accept_all() {
            return true;
        }
        self.canonical
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .any(|token| eq_ignore_case(token, identifier))
    }
}

/// Case-insensitive equality; lengths are compared before characters.
fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.chars().count() != b.chars().count() {
        return false;
    }
    a.chars()
        .zip(b.chars())
        .all(|(x, y)| x == y || x.to_lowercase().eq(y.to_lowercase()))
}

impl fmt::Display for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = CompiledFilter::compile("");
        assert!(filter.is_accept_all());
        assert!(filter.matches("X5"));
        assert!(filter.matches(""));
        assert!(filter.matches("anything at all"));
    }

    #[test]
    fn test_whitespace_only_filter_accepts_everything() {
        assert!(CompiledFilter::compile("  \t ").is_accept_all());
    }

    #[test]
    fn test_compile_strips_whitespace_and_lowercases() {
        let filter = CompiledFilter::compile(" A , b ");
        assert_eq!(filter.render(), "a,b");
        assert!(filter.matches("a"));
        assert!(filter.matches("B"));
        assert!(!filter.matches("c"));
    }

    #[test]
    fn test_compile_is_idempotent() {
        for raw in ["", " A , b ", "X5,  280 ,S5", ",,x,", "Ŵ1, ab c"] {
            let once = CompiledFilter::compile(raw);
            let twice = CompiledFilter::compile(once.render());
            assert_eq!(once, twice, "recompiling {raw:?} changed the filter");
        }
    }

    #[test]
    fn test_match_requires_whole_token() {
        let filter = CompiledFilter::compile("X5,280");
        assert!(!filter.matches("X"));
        assert!(!filter.matches("X55"));
        assert!(!filter.matches("28"));
        assert!(filter.matches("280"));
    }

    #[test]
    fn test_empty_tokens_are_ignored() {
        let filter = CompiledFilter::compile(",,x5,");
        assert!(filter.matches("X5"));
        assert!(!filter.matches(""));
    }

    #[test]
    fn test_match_is_order_independent() {
        let forward = CompiledFilter::compile("1,2,3");
        let backward = CompiledFilter::compile("3,2,1");
        for id in ["1", "2", "3", "4"] {
            assert_eq!(forward.matches(id), backward.matches(id));
        }
    }
}
