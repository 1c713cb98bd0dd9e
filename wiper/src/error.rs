//! Error types for wiper.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::channel::SessionKind;
use crate::provision::{State, Trigger};

/// Main error type for wiper operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid operator input
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session errors (prompt timeouts, closed channels)
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Device output that could not be interpreted
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A trigger fired from a state that does not allow it
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),
}

impl Error {
    /// Whether this error is an `expect` deadline elapsing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::Timeout { .. }))
    }
}

/// Configuration errors, reported before any session is opened.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more required options were not supplied anywhere
    #[error("Missing required option(s): {}", .options.join(", "))]
    Missing { options: Vec<String> },

    /// An option has a value of the wrong type
    #[error("Invalid value '{value}' for --{option}: {reason}")]
    Invalid {
        option: String,
        value: String,
        reason: String,
    },

    /// The config file exists but could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML or has unexpected value types
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Server host key does not match known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Server host key is not in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session layer errors (pattern matching, channel lifetime).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No pattern matched before the deadline
    #[error("Pattern not found within {timeout:?}; last output: {:?}", tail(.output))]
    Timeout { timeout: Duration, output: String },

    /// Channel closed by the peer
    #[error("Channel closed")]
    Closed,

    /// `expect` called without any pattern
    #[error("No patterns to expect")]
    NoPatterns,

    /// The session has not been opened yet
    #[error("{0} session is not connected")]
    NotConnected(SessionKind),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Device output errors.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// `show sol` output did not contain a usable status row
    #[error("Malformed SOL status output: {output:?}")]
    MalformedSolStatus { output: String },
}

/// Firing a trigger from a state outside its source set.
///
/// This always indicates a bug in the state graph or an out-of-order prompt
/// from the device; it is never retried.
#[derive(Error, Debug)]
#[error("Trigger '{trigger}' cannot fire from state '{state}'")]
pub struct TransitionError {
    pub trigger: Trigger,
    pub state: State,
}

/// Keep diagnostics readable when a console has been chatty.
fn tail(output: &str) -> &str {
    const MAX: usize = 256;
    if output.len() <= MAX {
        return output;
    }
    let mut start = output.len() - MAX;
    while !output.is_char_boundary(start) {
        start += 1;
    }
    &output[start..]
}

/// Result type alias using wiper's Error.
pub type Result<T> = std::result::Result<T, Error>;
