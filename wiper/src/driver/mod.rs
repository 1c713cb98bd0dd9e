//! Command helpers for driving a session.
//!
//! The driver layer turns single send/expect exchanges and fixed command
//! scripts into calls against a [`Session`](crate::channel::Session).

mod step;

pub use step::{
    SequenceBuilder, SequenceBuilderWithInput, Step, run_branch, run_sequence, run_step,
};
