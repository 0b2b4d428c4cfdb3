use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};

use crate::error::{Error, Result};
use crate::questions::{QuestionKind, QuestionSpec};

/// Interactive prompt surface.
///
/// Commands and the reconciler depend on this trait so tests can script
/// answers without a terminal.
pub trait Prompt {
    /// Ask a single question, returning the raw input. Parsing and
    /// validation happen at the reconciliation boundary.
    fn ask(&self, question: &QuestionSpec) -> Result<String>;

    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    fn select(&self, message: &str, options: &[String]) -> Result<String>;
}

/// Terminal implementation backed by dialoguer.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn theme() -> ColorfulTheme {
        ColorfulTheme::default()
    }
}

impl Prompt for TerminalPrompt {
    fn ask(&self, question: &QuestionSpec) -> Result<String> {
        let message = if question.help.is_empty() {
            question.name.clone()
        } else {
            question.help.clone()
        };

        match question.kind {
            QuestionKind::Bool => {
                let default = matches!(
                    question.default,
                    Some(crate::questions::AnswerValue::Bool(true))
                );
                let answer = Confirm::with_theme(&Self::theme())
                    .with_prompt(message)
                    .default(default)
                    .interact()?;
                Ok(answer.to_string())
            }
            QuestionKind::Choice => {
                let default_index = question
                    .default
                    .as_ref()
                    .and_then(|d| question.choices.iter().position(|c| c == &d.to_string()))
                    .unwrap_or(0);
                let index = Select::with_theme(&Self::theme())
                    .with_prompt(message)
                    .items(&question.choices)
                    .default(default_index)
                    .interact()?;
                question
                    .choices
                    .get(index)
                    .cloned()
                    .ok_or_else(|| Error::validation(&question.name, "selection out of range"))
            }
            QuestionKind::Str | QuestionKind::Path if question.secret => {
                let answer = Password::with_theme(&Self::theme())
                    .with_prompt(message)
                    .allow_empty_password(true)
                    .interact()?;
                Ok(answer)
            }
            QuestionKind::Str | QuestionKind::Path => {
                let theme = Self::theme();
                let mut input = Input::<String>::with_theme(&theme).with_prompt(message);
                if let Some(default) = &question.default {
                    input = input.default(default.to_string());
                }
                Ok(input.interact_text()?)
            }
        }
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Ok(Confirm::with_theme(&Self::theme())
            .with_prompt(message)
            .default(default)
            .interact()?)
    }

    fn select(&self, message: &str, options: &[String]) -> Result<String> {
        let index = Select::with_theme(&Self::theme())
            .with_prompt(message)
            .items(options)
            .default(0)
            .interact()?;
        options
            .get(index)
            .cloned()
            .ok_or_else(|| Error::validation(message, "selection out of range"))
    }
}
