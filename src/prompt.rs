// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! User consent prompts.

use colored::Colorize;
use inquire::{InquireError, Text};

/// Layer of indirection for yes/no questions.
pub trait Prompter {
    /// Ask question, returning true on consent.
    ///
    /// # Errors
    ///
    /// - Return [`Error::Inquire`] if prompt cannot be shown.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Terminal prompter.
///
/// Anything but `y` or `yes` in any letter case counts as no.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompter;

impl InquirePrompter {
    /// Construct new terminal prompter.
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for InquirePrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        let message = format!("{} (y/N)", question.cyan().bold());
        match Text::new(&message).prompt() {
            Ok(answer) => Ok(parse_answer(&answer)),
            Err(InquireError::OperationCanceled) => Ok(false),
            Err(err) => Err(Error::Inquire(err)),
        }
    }
}

/// Interpret free-form answer to yes/no question.
pub fn parse_answer(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Prompt error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Terminal prompt failed.
    #[error(transparent)]
    Inquire(#[from] InquireError),
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
