//! Ordered prompt sets for multi-way branching.

use regex::Regex;

/// An ordered list of prompt patterns, each paired with the outcome it selects.
///
/// The same list supplies both the patterns handed to `expect` and the
/// outcome looked up from the matched index, so the two can never disagree
/// about ordering.
#[derive(Debug, Clone)]
pub struct PromptSet<T> {
    entries: Vec<(Regex, T)>,
}

impl<T: Clone> PromptSet<T> {
    /// Compile `(pattern, outcome)` pairs, keeping their order.
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, T)>) -> Result<Self, regex::Error> {
        let entries = entries
            .into_iter()
            .map(|(pattern, outcome)| Ok((Regex::new(pattern)?, outcome)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { entries })
    }

    /// The compiled patterns, in order.
    pub fn patterns(&self) -> Vec<Regex> {
        self.entries.iter().map(|(re, _)| re.clone()).collect()
    }

    /// The outcome paired with the pattern at `index`.
    pub fn outcome(&self, index: usize) -> Option<T> {
        self.entries.get(index).map(|(_, outcome)| outcome.clone())
    }

    /// Number of prompts in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compile a list of pattern strings.
pub fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|p| Regex::new(p)).collect()
}

/// Index of the first pattern, in list order, that matches `text`.
pub fn first_match(patterns: &[Regex], text: &str) -> Option<usize> {
    patterns.iter().position(|re| re.is_match(text))
}
