//! Interactive session over one byte channel.

use std::fmt;
use std::time::Duration;

use log::debug;
use regex::Regex;

use super::buffer::OutputBuffer;
use super::patterns::first_match;
use crate::error::{ChannelError, Result};
use crate::transport::ByteChannel;

/// Default time to wait for a prompt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which physical target a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// The CIMC management shell.
    Cimc,

    /// The APIC serial console, relayed by CIMC SOL.
    Apic,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Cimc => f.write_str("cimc"),
            SessionKind::Apic => f.write_str("apic"),
        }
    }
}

/// An expect-style session: send lines, then block until a prompt shows up.
///
/// Output accumulates across calls until [`clear`](Self::clear) is called.
/// Callers clear at step boundaries where leftovers from an earlier step
/// could match the next prompt.
pub struct Session<C> {
    channel: C,
    kind: SessionKind,
    buffer: OutputBuffer,
    timeout: Duration,
    newline: &'static str,
}

impl<C: ByteChannel> Session<C> {
    /// Wrap an open channel.
    pub fn new(channel: C, kind: SessionKind) -> Self {
        Self {
            channel,
            kind,
            buffer: OutputBuffer::new(),
            timeout: DEFAULT_TIMEOUT,
            newline: "\r",
        }
    }

    /// Override the default prompt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The target this session talks to.
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Default prompt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write `text` followed by the line terminator.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let mut line = String::with_capacity(text.len() + self.newline.len());
        line.push_str(text);
        line.push_str(self.newline);
        self.channel.write(line.as_bytes()).await
    }

    /// Wait until the clean output matches one of `patterns`.
    ///
    /// Returns the index of the first pattern, in the given order, that
    /// matches. Output already in the buffer is considered before reading.
    pub async fn expect(&mut self, patterns: &[Regex], timeout: Duration) -> Result<usize> {
        if patterns.is_empty() {
            return Err(ChannelError::NoPatterns.into());
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(index) = first_match(patterns, self.buffer.clean()) {
                return Ok(index);
            }

            let chunk = match tokio::time::timeout_at(deadline, self.channel.read()).await {
                Ok(chunk) => chunk?,
                Err(_) => {
                    return Err(ChannelError::Timeout {
                        timeout,
                        output: self.buffer.clean().to_string(),
                    }
                    .into());
                }
            };

            match chunk {
                Some(data) => {
                    debug!("[{}] {}", self.kind, String::from_utf8_lossy(&data).escape_debug());
                    self.buffer.extend(&data);
                }
                None => return Err(ChannelError::Closed.into()),
            }
        }
    }

    /// Drop everything received so far.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Clean output received since the last clear.
    pub fn output(&self) -> &str {
        self.buffer.clean()
    }

    /// Raw output received since the last clear.
    pub fn raw_output(&self) -> std::borrow::Cow<'_, str> {
        self.buffer.raw_lossy()
    }

    /// Close the underlying channel.
    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await
    }
}
