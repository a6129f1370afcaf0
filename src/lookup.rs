//! Stop long-name extraction from the stop lookup endpoint.
//!
//! The lookup response is a JSON object describing the stop. Only one field
//! matters, so instead of deserializing the whole document the bytes are
//! streamed through [`JsonStreamingParser`] with a listener that remembers the
//! last key it saw and captures the value of the named field.

use crate::json::{JsonListener, JsonStreamingParser};
use crate::LocationName;

/// Field holding the stop's full display name.
pub const LONG_NAME_FIELD: &str = "long_name";

/// Listener capturing the value of a single named field.
#[derive(Debug, Clone)]
pub struct LongNameExtractor {
    field: String,
    current_key: String,
    captured: Option<String>,
}

impl Default for LongNameExtractor {
    fn default() -> Self {
        Self::new(LONG_NAME_FIELD)
    }
}

impl LongNameExtractor {
    pub fn new(field: &str) -> Self {
        Self {
            field: field.to_string(),
            current_key: String::new(),
            captured: None,
        }
    }

    pub fn captured(&self) -> Option<&str> {
        self.captured.as_deref()
    }

    /// Captured value bounded to a location name.
    pub fn into_location_name(self) -> Option<LocationName> {
        self.captured.map(|name| LocationName::new(&name))
    }
}

impl JsonListener for LongNameExtractor {
    fn key(&mut self, key: &str) {
        self.current_key.clear();
        self.current_key.push_str(key);
    }

    fn value(&mut self, value: &str) {
        if self.current_key == self.field {
            self.captured = Some(value.to_string());
        }
    }
}

/// Feeds body bytes to the parser, ignoring anything before the first
/// `{` or `[` (stray bytes such as chunk sizes or a byte-order mark).
#[derive(Debug, Default)]
pub struct LookupBody {
    parser: JsonStreamingParser,
    extractor: LongNameExtractor,
    in_body: bool,
}

impl LookupBody {
    pub fn new(extractor: LongNameExtractor) -> Self {
        Self {
            parser: JsonStreamingParser::new(),
            extractor,
            in_body: false,
        }
    }

    pub fn feed(&mut self, byte: u8) {
        if !self.in_body && (byte == b'{' || byte == b'[') {
            self.in_body = true;
        }
        if self.in_body {
            self.parser.parse(byte, &mut self.extractor);
        }
    }

    /// True when no JSON was seen, or the document was closed properly.
    pub fn is_structurally_complete(&self) -> bool {
        !self.in_body || self.parser.is_document_complete()
    }

    /// True once a JSON document has been read to its closing bracket.
    pub fn is_document_complete(&self) -> bool {
        self.in_body && self.parser.is_document_complete()
    }

    pub fn into_extractor(self) -> LongNameExtractor {
        self.extractor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(body: &str) -> LookupBody {
        let mut lookup = LookupBody::default();
        for byte in body.bytes() {
            lookup.feed(byte);
        }
        lookup
    }

    #[test]
    fn test_captures_long_name() {
        let body = r#"{"atco_code":"340000004H3","name":"Gloucester Green","long_name":"Oxford, Gloucester Green (Stop H3)","indicator":"H3"}"#;
        let lookup = feed_all(body);
        assert!(lookup.is_structurally_complete());
        let extractor = lookup.into_extractor();
        assert_eq!(extractor.captured(), Some("Oxford, Gloucester Green (Stop H3)"));
    }

    #[test]
    fn test_leading_bytes_are_skipped() {
        let lookup = feed_all("5f\r\n{\"long_name\": \"Market Square\"}\r\n0\r\n");
        assert_eq!(lookup.into_extractor().captured(), Some("Market Square"));
    }

    #[test]
    fn test_other_keys_do_not_capture() {
        let lookup = feed_all(r#"{"name": "Short", "locality": {"long_name_hint": "x"}}"#);
        assert_eq!(lookup.into_extractor().captured(), None);
    }

    #[test]
    fn test_nested_field_is_found() {
        let lookup = feed_all(r#"{"stop": {"long_name": "Broad Street"}}"#);
        assert_eq!(lookup.into_extractor().captured(), Some("Broad Street"));
    }

    #[test]
    fn test_location_name_is_bounded() {
        let long = "N".repeat(100);
        let lookup = feed_all(&format!("{{\"long_name\": \"{long}\"}}"));
        let name = lookup.into_extractor().into_location_name().unwrap();
        assert_eq!(name.char_len(), crate::MAX_LOCATION_CHARS);
    }

    #[test]
    fn test_truncated_document_is_incomplete() {
        let lookup = feed_all(r#"{"long_name": "Broad Str"#);
        assert!(!lookup.is_structurally_complete());
    }

    #[test]
    fn test_document_completion() {
        let mut lookup = LookupBody::default();
        assert!(!lookup.is_document_complete());
        for byte in br#"{"long_name": "Market Square"}"# {
            lookup.feed(*byte);
        }
        assert!(lookup.is_document_complete());
    }

    #[test]
    fn test_custom_field() {
        let mut parser = JsonStreamingParser::new();
        let mut extractor = LongNameExtractor::new("indicator");
        for byte in br#"{"indicator": "H3", "long_name": "Oxford"}"# {
            parser.parse(*byte, &mut extractor);
        }
        assert_eq!(extractor.captured(), Some("H3"));
    }
}
