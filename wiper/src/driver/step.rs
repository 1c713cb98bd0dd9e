//! Send/expect steps and the helpers that run them against a session.
//!
//! Most device interaction is "type this, then wait for that":
//! - `scope sol` waits for the `/sol #` prompt
//! - `commit` waits for the scope prompt again, but may take longer
//! - a wizard answer waits for whichever question comes next
//!
//! A [`Step`] captures one such exchange; [`run_sequence`] runs a fixed script
//! of them, and [`run_branch`] maps the matched prompt to an outcome.

use std::time::Duration;

use log::{debug, error};
use regex::Regex;

use crate::channel::{PromptSet, Session, compile_all};
use crate::error::{ChannelError, Result};
use crate::transport::ByteChannel;

const MASK: &str = "********";

/// One send/expect exchange.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use wiper::driver::Step;
///
/// let commit = Step::new("commit", r"C220-.* /sol # ")
///     .unwrap()
///     .with_timeout(Duration::from_secs(30));
/// assert!(commit.clear);
/// ```
#[derive(Debug, Clone)]
pub struct Step {
    /// The text to send (a line terminator is appended).
    pub input: String,

    /// Patterns to wait for, in priority order.
    pub patterns: Vec<Regex>,

    /// Clear the session output before sending.
    pub clear: bool,

    /// Timeout override; the session default applies when `None`.
    pub timeout: Option<Duration>,

    /// Whether the input should be masked in logs (e.g., passwords).
    pub hidden: bool,
}

impl Step {
    /// Create a step waiting for a single pattern.
    pub fn new(input: impl Into<String>, pattern: &str) -> Result<Self> {
        Self::any_of(input, &[pattern])
    }

    /// Create a step waiting for any of several patterns.
    pub fn any_of(input: impl Into<String>, patterns: &[&str]) -> Result<Self> {
        let patterns = compile_all(patterns).map_err(ChannelError::InvalidPattern)?;
        Ok(Self::with_patterns(input, patterns))
    }

    /// Create a step from already compiled patterns.
    pub fn with_patterns(input: impl Into<String>, patterns: Vec<Regex>) -> Self {
        Self {
            input: input.into(),
            patterns,
            clear: true,
            timeout: None,
            hidden: false,
        }
    }

    /// Set a custom timeout for this step.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Keep earlier output in the session buffer instead of clearing it.
    pub fn keep_output(mut self) -> Self {
        self.clear = false;
        self
    }

    /// Mark this step's input as hidden (for logging).
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// The input as it may appear in logs.
    pub fn display_input(&self) -> &str {
        if self.hidden { MASK } else { &self.input }
    }

    fn pattern_list(&self) -> String {
        let patterns: Vec<&str> = self.patterns.iter().map(Regex::as_str).collect();
        format!("{patterns:?}")
    }
}

/// Run one step: optionally clear, send, then wait for a pattern.
///
/// Returns the index of the matched pattern. Errors are logged with the
/// attempted command and prompt, then returned unchanged.
pub async fn run_step<C: ByteChannel>(session: &mut Session<C>, step: &Step) -> Result<usize> {
    if step.clear {
        debug!("Clearing {} session output", session.kind());
        session.clear();
    }

    debug!("[{}] Sending cmd: '{}'", session.kind(), step.display_input());
    if let Err(e) = session.send(&step.input).await {
        error!("Failed to send the command: '{}'", step.display_input());
        return Err(e);
    }

    let timeout = step.timeout.unwrap_or(session.timeout());
    debug!(
        "[{}] Expecting prompt: {} with a timeout of {:?}",
        session.kind(),
        step.pattern_list(),
        timeout
    );
    match session.expect(&step.patterns, timeout).await {
        Ok(index) => Ok(index),
        Err(e) => {
            error!("Failed to detect the prompt using: {}", step.pattern_list());
            error!("current output: {:?}", session.output());
            Err(e)
        }
    }
}

/// Run a step whose patterns come from a [`PromptSet`], returning the
/// outcome paired with the prompt that appeared.
pub async fn run_branch<C: ByteChannel, T: Clone>(
    session: &mut Session<C>,
    step: Step,
    prompts: &PromptSet<T>,
) -> Result<T> {
    let step = Step {
        patterns: prompts.patterns(),
        ..step
    };
    let index = run_step(session, &step).await?;
    prompts
        .outcome(index)
        .ok_or_else(|| ChannelError::NoPatterns.into())
}

/// Run steps in order, stopping at the first failure.
pub async fn run_sequence<C: ByteChannel>(session: &mut Session<C>, steps: &[Step]) -> Result<()> {
    debug!("Sending a bulk set of {} commands to {}", steps.len(), session.kind());
    for step in steps {
        run_step(session, step).await?;
    }
    Ok(())
}

/// Builder for fixed command scripts.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use wiper::driver::SequenceBuilder;
///
/// let steps = SequenceBuilder::new()
///     .send("scope chassis")
///     .expect(r"C220-.* /chassis # ")
///     .unwrap()
///     .send("power cycle")
///     .expect(r".*Do you want to continue\?\[.*\].*")
///     .unwrap()
///     .build();
/// assert_eq!(steps.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SequenceBuilder {
    steps: Vec<Step>,
}

impl SequenceBuilder {
    /// Create a new sequence builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input to send.
    ///
    /// Must be followed by `expect()` to specify what to wait for.
    pub fn send(self, input: impl Into<String>) -> SequenceBuilderWithInput {
        SequenceBuilderWithInput {
            builder: self,
            input: input.into(),
            timeout: None,
        }
    }

    /// Build the list of steps.
    pub fn build(self) -> Vec<Step> {
        self.steps
    }
}

/// Intermediate state for the builder after `send()` is called.
#[derive(Debug)]
pub struct SequenceBuilderWithInput {
    builder: SequenceBuilder,
    input: String,
    timeout: Option<Duration>,
}

impl SequenceBuilderWithInput {
    /// Specify the pattern to wait for after sending the input.
    pub fn expect(mut self, pattern: &str) -> Result<SequenceBuilder> {
        let mut step = Step::new(self.input, pattern)?;
        if let Some(timeout) = self.timeout {
            step = step.with_timeout(timeout);
        }
        self.builder.steps.push(step);
        Ok(self.builder)
    }

    /// Set a custom timeout for this specific step.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::SessionKind;
    use crate::transport::mock::ScriptedChannel;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_step_defaults() {
        let step = Step::new("show sol", r".*C220.*# ").unwrap();
        assert_eq!(step.input, "show sol");
        assert!(step.clear);
        assert!(!step.hidden);
        assert!(step.timeout.is_none());
    }

    #[test]
    fn test_hidden_step_masks_input() {
        let step = Step::new("p@s$w0rd", r"~> ").unwrap().hidden();
        assert_eq!(step.display_input(), "********");
        assert_eq!(step.input, "p@s$w0rd");
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Step::new("x", r"(unclosed").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Channel(ChannelError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_sequence_builder() {
        let steps = SequenceBuilder::new()
            .send("scope sol")
            .expect(r"/sol # ")
            .unwrap()
            .send("commit")
            .with_timeout(Duration::from_secs(30))
            .expect(r"/sol # ")
            .unwrap()
            .build();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].input, "scope sol");
        assert!(steps[0].timeout.is_none());
        assert_eq!(steps[1].timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_step_clears_stale_output() {
        let channel = ScriptedChannel::new()
            .on("exit", "apic1 login: ")
            .on("rescue-user", "Password: ");
        let mut session = Session::new(channel, SessionKind::Apic);

        let exit = Step::new("exit", r"login:").unwrap();
        assert_eq!(assert_ok!(run_step(&mut session, &exit).await), 0);

        // Without clearing, the leftover login prompt would satisfy this.
        let login = Step::any_of("rescue-user", &[r"login:", r"Password:"]).unwrap();
        assert_eq!(assert_ok!(run_step(&mut session, &login).await), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_step_keep_output() {
        let channel = ScriptedChannel::new()
            .on("exit", "apic1 login: ")
            .on("rescue-user", "Password: ");
        let mut session = Session::new(channel, SessionKind::Apic);

        run_step(&mut session, &Step::new("exit", r"login:").unwrap())
            .await
            .unwrap();
        let login = Step::any_of("rescue-user", &[r"login:", r"Password:"])
            .unwrap()
            .keep_output();
        assert_eq!(run_step(&mut session, &login).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_step_uses_timeout_override() {
        let channel =
            ScriptedChannel::new().on_delayed("commit", Duration::from_secs(20), "C220-X /sol # ");
        let mut session = Session::new(channel, SessionKind::Cimc);

        let commit = Step::new("commit", r"/sol # ")
            .unwrap()
            .with_timeout(Duration::from_secs(30));
        assert_ok!(run_step(&mut session, &commit).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_step_default_timeout_elapses() {
        let channel =
            ScriptedChannel::new().on_delayed("commit", Duration::from_secs(20), "C220-X /sol # ");
        let mut session = Session::new(channel, SessionKind::Cimc);

        let commit = Step::new("commit", r"/sol # ").unwrap();
        let err = assert_err!(run_step(&mut session, &commit).await);
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_branch_maps_outcome() {
        let channel = ScriptedChannel::new().on("4093", "Enter the IP address [192.168.10.1/24]:");
        let mut session = Session::new(channel, SessionKind::Apic);
        let prompts = PromptSet::new([
            (r".*BD multicast.*", "multicast"),
            (r".*Enter the IP address \[.*\].*", "oob"),
        ])
        .unwrap();

        let step = Step::with_patterns("4093", Vec::new());
        let outcome = run_branch(&mut session, step, &prompts).await.unwrap();
        assert_eq!(outcome, "oob");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sequence_aborts_on_first_failure() {
        let channel = ScriptedChannel::new()
            .on("scope chassis", "C220-X /chassis # ")
            .on("power cycle", "Error: unknown command\r\n")
            .on("y", "C220-X /chassis # ");
        let sent = channel.sent();
        let mut session = Session::new(channel, SessionKind::Cimc);

        let steps = SequenceBuilder::new()
            .send("scope chassis")
            .expect(r"/chassis # ")
            .unwrap()
            .send("power cycle")
            .expect(r"Do you want to continue")
            .unwrap()
            .send("y")
            .expect(r"/chassis # ")
            .unwrap()
            .build();

        let err = assert_err!(run_sequence(&mut session, &steps).await);
        assert!(err.is_timeout());
        assert_eq!(sent.lines(), vec!["scope chassis", "power cycle"]);
    }
}
