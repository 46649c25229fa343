//! Confirmation prompt abstraction
//!
//! The orchestrator asks questions through this trait so scripted and test
//! execution can substitute a non-interactive answer. The non-interactive
//! default is "no": scripts never destroy an install by accident.

use anyhow::Result;
use std::io::IsTerminal;

pub trait Prompter {
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Interactive y/N prompt via dialoguer, defaulting to no
pub struct InteractivePrompter;

impl Prompter for InteractivePrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        Ok(dialoguer::Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()?)
    }
}

/// Always answers "no"; used when stdin is not a terminal
pub struct AssumeNo;

impl Prompter for AssumeNo {
    fn confirm(&self, _question: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Pick the prompter appropriate for the current execution context
pub fn default_prompter() -> Box<dyn Prompter> {
    if std::io::stdin().is_terminal() {
        Box::new(InteractivePrompter)
    } else {
        Box::new(AssumeNo)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Fixed-answer prompter for orchestrator tests
    pub struct Scripted(pub bool);

    impl Prompter for Scripted {
        fn confirm(&self, _question: &str) -> Result<bool> {
            Ok(self.0)
        }
    }
}
