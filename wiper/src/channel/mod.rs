//! Channel layer for interactive sessions.
//!
//! This module handles expect-style session management, including ordered
//! prompt matching and escape-sequence stripping.

mod buffer;
mod patterns;
mod session;

pub use buffer::OutputBuffer;
pub use patterns::{PromptSet, compile_all, first_match};
pub use session::{DEFAULT_TIMEOUT, Session, SessionKind};
