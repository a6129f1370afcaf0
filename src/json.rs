//! # Streaming JSON Events
//!
//! The lookup response is fed in one byte at a time as it comes off the
//! socket. [`JsonStreamingParser`] pushes those bytes into an `actson` push
//! parser and forwards the resulting events to a [`JsonListener`], so nothing
//! beyond the current token is ever buffered.

use actson::feeder::PushJsonFeeder;
use actson::{JsonEvent, JsonParser};
use std::fmt;
use tracing::debug;

/// Receiver of parse events. Only `key` and `value` are required.
pub trait JsonListener {
    /// An object key was read.
    fn key(&mut self, key: &str);

    /// A scalar value was read. Strings arrive unescaped; numbers, `true`,
    /// `false` and `null` arrive as their literal text.
    fn value(&mut self, value: &str);

    fn start_object(&mut self) {}
    fn end_object(&mut self) {}
    fn start_array(&mut self) {}
    fn end_array(&mut self) {}
}

/// Byte-fed JSON event parser.
///
/// Bytes after the outermost container closes are ignored, as is
/// everything after a syntax error.
///
/// # Example
/// ```
/// use departures_board_lib::json::{JsonListener, JsonStreamingParser};
///
/// #[derive(Default)]
/// struct Keys(Vec<String>);
///
/// impl JsonListener for Keys {
///     fn key(&mut self, key: &str) { self.0.push(key.to_string()); }
///     fn value(&mut self, _value: &str) {}
/// }
///
/// let mut parser = JsonStreamingParser::new();
/// let mut keys = Keys::default();
/// for byte in br#"{"atco_code": "340000004H3", "name": "Gloucester Green"}"# {
///     parser.parse(*byte, &mut keys);
/// }
/// assert_eq!(keys.0, ["atco_code", "name"]);
/// assert!(parser.is_document_complete());
/// ```
pub struct JsonStreamingParser {
    parser: JsonParser<PushJsonFeeder>,
    depth: usize,
    started: bool,
    failed: bool,
}

impl Default for JsonStreamingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonStreamingParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStreamingParser")
            .field("depth", &self.depth)
            .field("started", &self.started)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl JsonStreamingParser {
    pub fn new() -> Self {
        Self {
            parser: JsonParser::new(PushJsonFeeder::new()),
            depth: 0,
            started: false,
            failed: false,
        }
    }

    /// True once the outermost container has been closed again.
    pub fn is_document_complete(&self) -> bool {
        self.started && self.depth == 0 && !self.failed
    }

    /// True after a syntax error; later bytes are dropped.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Feed one byte.
    pub fn parse<L: JsonListener + ?Sized>(&mut self, byte: u8, listener: &mut L) {
        if self.failed || self.is_document_complete() {
            return;
        }
        // The feeder is drained after every push, so it always has room.
        if self.parser.feeder.push_bytes(&[byte]) == 0 {
            self.drain(listener);
            self.parser.feeder.push_bytes(&[byte]);
        }
        self.drain(listener);
    }

    fn drain<L: JsonListener + ?Sized>(&mut self, listener: &mut L) {
        loop {
            let event = match self.parser.next_event() {
                Ok(Some(JsonEvent::NeedMoreInput)) | Ok(None) => return,
                Ok(Some(event)) => event,
                Err(e) => {
                    debug!("Lookup body is not valid JSON: {:?}", e);
                    self.failed = true;
                    return;
                }
            };
            match event {
                JsonEvent::StartObject => {
                    self.open();
                    listener.start_object();
                }
                JsonEvent::StartArray => {
                    self.open();
                    listener.start_array();
                }
                JsonEvent::EndObject => {
                    self.depth = self.depth.saturating_sub(1);
                    listener.end_object();
                }
                JsonEvent::EndArray => {
                    self.depth = self.depth.saturating_sub(1);
                    listener.end_array();
                }
                JsonEvent::FieldName => {
                    if let Ok(key) = self.parser.current_str() {
                        listener.key(key);
                    }
                }
                JsonEvent::ValueString | JsonEvent::ValueInt | JsonEvent::ValueFloat => {
                    if let Ok(value) = self.parser.current_str() {
                        listener.value(value);
                    }
                }
                JsonEvent::ValueTrue => listener.value("true"),
                JsonEvent::ValueFalse => listener.value("false"),
                JsonEvent::ValueNull => listener.value("null"),
                JsonEvent::NeedMoreInput => {}
            }
            if self.is_document_complete() {
                return;
            }
        }
    }

    fn open(&mut self) {
        self.started = true;
        self.depth += 1;
    }
}
