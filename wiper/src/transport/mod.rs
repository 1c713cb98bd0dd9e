//! Transport boundary and the SSH implementation wrapping russh.
//!
//! The session layer only needs an authenticated, full-duplex byte stream.
//! [`ByteChannel`] is that boundary; [`Connector`] opens one per session kind.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

use std::future::Future;

use bytes::Bytes;

pub use config::{HostKeyVerification, SshConfig};
pub use ssh::{SshChannel, SshConnector, SshTransport};

use crate::channel::SessionKind;
use crate::error::Result;

/// An authenticated byte stream with no framing of its own.
pub trait ByteChannel: Send {
    /// Write bytes to the remote end.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output. `None` means the peer closed.
    ///
    /// Must be cancel-safe: a read dropped at a deadline loses no data.
    fn read(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Close the channel and its connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens channels for the provisioning sessions.
pub trait Connector: Send + Sync {
    /// Channel type produced by this connector.
    type Channel: ByteChannel;

    /// Establish the channel for `kind`.
    fn connect(&self, kind: SessionKind) -> impl Future<Output = Result<Self::Channel>> + Send;
}
