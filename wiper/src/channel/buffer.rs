//! Session output buffer with escape-sequence stripping.
//!
//! The console behind SOL is a real terminal: the APIC setup wizard and the
//! CIMC shell both emit cursor movement and screen clears. Prompts are matched
//! against a clean text view, while the raw bytes are kept for diagnostics.

use std::fmt;

use bytes::BytesMut;
use vte::{Parser, Perform};

/// Raw and clean views of everything received since the last clear.
pub struct OutputBuffer {
    /// Bytes exactly as received.
    raw: BytesMut,

    /// Printable text and line control characters only.
    clean: String,

    /// Escape parser; kept across chunks so a sequence split between two
    /// reads is still stripped.
    parser: Parser,
}

impl OutputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            raw: BytesMut::with_capacity(4096),
            clean: String::with_capacity(4096),
            parser: Parser::new(),
        }
    }

    /// Append received bytes to both views.
    pub fn extend(&mut self, data: &[u8]) {
        self.raw.extend_from_slice(data);
        let mut sink = CleanSink {
            out: &mut self.clean,
        };
        self.parser.advance(&mut sink, data);
    }

    /// The stripped text used for pattern matching.
    pub fn clean(&self) -> &str {
        &self.clean
    }

    /// The raw bytes as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Get the raw contents as a string (lossy UTF-8 conversion).
    pub fn raw_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Reset both views and the escape parser.
    pub fn clear(&mut self) {
        self.raw.clear();
        self.clean.clear();
        self.parser = Parser::new();
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OutputBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputBuffer")
            .field("raw_len", &self.raw.len())
            .field("clean", &self.clean)
            .finish()
    }
}

/// vte performer that keeps printable characters and line controls.
struct CleanSink<'a> {
    out: &'a mut String,
}

impl Perform for CleanSink<'_> {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte as char);
        }
    }
}
