//! Scripted channels for exercising sessions and the provisioner offline.
//!
//! A script is an ordered list of (line sent, output replied). Each write must
//! match the next scripted line exactly, otherwise the write fails with an
//! I/O error naming both lines. Replies can be split into chunks or delayed on
//! the tokio clock, which tests run paused.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use super::{ByteChannel, Connector};
use crate::channel::SessionKind;
use crate::error::{Result, TransportError};

/// Every line written to a scripted channel, shared with the test.
#[derive(Debug, Clone, Default)]
pub(crate) struct SentLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl SentLog {
    /// Lines exactly as written, terminator included.
    pub(crate) fn raw(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// Lines with the trailing `\r` removed.
    pub(crate) fn lines(&self) -> Vec<String> {
        self.raw()
            .into_iter()
            .map(|l| l.strip_suffix('\r').map(str::to_string).unwrap_or(l))
            .collect()
    }

    fn push(&self, line: String) {
        self.lines.lock().unwrap().push(line);
    }
}

struct Exchange {
    input: String,
    chunks: Vec<String>,
    delay: Duration,
}

struct Pending {
    ready_at: Instant,
    data: Bytes,
}

/// A [`ByteChannel`] that replays a fixed dialogue.
pub(crate) struct ScriptedChannel {
    script: VecDeque<Exchange>,
    inbox: VecDeque<Pending>,
    sent: SentLog,
    close_when_done: bool,
    closed: Arc<Mutex<bool>>,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self {
            script: VecDeque::new(),
            inbox: VecDeque::new(),
            sent: SentLog::default(),
            close_when_done: false,
            closed: Arc::new(Mutex::new(false)),
        }
    }

    /// Reply `output` immediately when `input` is sent. Empty output is
    /// silence.
    pub(crate) fn on(self, input: &str, output: &str) -> Self {
        self.on_chunks(input, &[output])
    }

    /// Reply with several separate reads.
    pub(crate) fn on_chunks(mut self, input: &str, chunks: &[&str]) -> Self {
        self.script.push_back(Exchange {
            input: input.to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            delay: Duration::ZERO,
        });
        self
    }

    /// Reply `output` only after `delay` has passed since `input` was sent.
    pub(crate) fn on_delayed(mut self, input: &str, delay: Duration, output: &str) -> Self {
        self.script.push_back(Exchange {
            input: input.to_string(),
            chunks: vec![output.to_string()],
            delay,
        });
        self
    }

    /// Report EOF once the script and the pending output are exhausted,
    /// instead of staying silent forever.
    pub(crate) fn closed_after_script(mut self) -> Self {
        self.close_when_done = true;
        self
    }

    pub(crate) fn sent(&self) -> SentLog {
        self.sent.clone()
    }

    /// Whether `close` has been called.
    pub(crate) fn closed_flag(&self) -> Arc<Mutex<bool>> {
        self.closed.clone()
    }
}

impl ByteChannel for ScriptedChannel {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let raw = String::from_utf8_lossy(data).into_owned();
        self.sent.push(raw.clone());
        let line = raw.strip_suffix('\r').unwrap_or(&raw).to_string();

        let Some(exchange) = self.script.pop_front() else {
            return Err(TransportError::Io(io::Error::other(format!(
                "unscripted input {line:?}"
            )))
            .into());
        };
        if exchange.input != line {
            return Err(TransportError::Io(io::Error::other(format!(
                "expected input {:?}, got {line:?}",
                exchange.input
            )))
            .into());
        }

        let ready_at = Instant::now() + exchange.delay;
        for chunk in exchange.chunks.into_iter().filter(|c| !c.is_empty()) {
            self.inbox.push_back(Pending {
                ready_at,
                data: Bytes::from(chunk),
            });
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Bytes>> {
        match self.inbox.front().map(|p| p.ready_at) {
            Some(ready_at) => {
                // Pop only once ready so a read cancelled at a deadline keeps
                // the chunk for the next one.
                tokio::time::sleep_until(ready_at).await;
                Ok(self.inbox.pop_front().map(|p| p.data))
            }
            None if self.close_when_done && self.script.is_empty() => Ok(None),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// Hands out one scripted channel per session kind.
pub(crate) struct ScriptedConnector {
    cimc: Mutex<Option<ScriptedChannel>>,
    apic: Mutex<Option<ScriptedChannel>>,
    refuse: bool,
}

impl ScriptedConnector {
    pub(crate) fn new(cimc: ScriptedChannel, apic: ScriptedChannel) -> Self {
        Self {
            cimc: Mutex::new(Some(cimc)),
            apic: Mutex::new(Some(apic)),
            refuse: false,
        }
    }

    /// A connector whose every connection fails authentication.
    pub(crate) fn refusing() -> Self {
        Self {
            cimc: Mutex::new(None),
            apic: Mutex::new(None),
            refuse: true,
        }
    }
}

impl Connector for ScriptedConnector {
    type Channel = ScriptedChannel;

    async fn connect(&self, kind: SessionKind) -> Result<ScriptedChannel> {
        if self.refuse {
            return Err(TransportError::AuthenticationFailed {
                user: "admin".to_string(),
            }
            .into());
        }
        let slot = match kind {
            SessionKind::Cimc => &self.cimc,
            SessionKind::Apic => &self.apic,
        };
        let channel = slot.lock().unwrap().take();
        channel.ok_or_else(|| TransportError::Disconnected.into())
    }
}
