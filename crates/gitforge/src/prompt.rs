//! Interactive input.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use gitforge_core::{Error, Result};

/// Checks a line of input. The error text is shown to the user.
pub type Validator = dyn Fn(&str) -> std::result::Result<(), String>;

/// Asks the user for input. Never called in batch mode.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter: Send + Sync {
    /// Pick one of `options`, preselecting `default` when it is one of them.
    fn select_one(&self, message: &str, options: &[String], default: &str) -> Result<String>;

    /// Pick any subset of `options`. `preselect_all` ticks every entry up front.
    fn multi_select(
        &self,
        message: &str,
        options: &[String],
        preselect_all: bool,
    ) -> Result<Vec<String>>;

    /// Read a line of text, re-asking until `validator` accepts it.
    fn prompt_text(&self, message: &str, default: &str, validator: &Validator) -> Result<String>;

    /// Read a secret without echoing it.
    fn prompt_secret(&self, message: &str) -> Result<String>;

    fn confirm(&self, message: &str, default: bool) -> Result<bool>;
}

/// Validator rejecting blank input.
pub fn required(value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        Err("Value is required".to_string())
    } else {
        Ok(())
    }
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::Prompt(e.to_string())
}

/// [`Prompter`] on the controlling terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn select_one(&self, message: &str, options: &[String], default: &str) -> Result<String> {
        if options.is_empty() {
            return Err(Error::Prompt(format!("Nothing to choose for: {}", message)));
        }
        let default_index = options.iter().position(|o| o == default).unwrap_or(0);
        let index = Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(options)
            .default(default_index)
            .interact()
            .map_err(prompt_error)?;
        Ok(options[index].clone())
    }

    fn multi_select(
        &self,
        message: &str,
        options: &[String],
        preselect_all: bool,
    ) -> Result<Vec<String>> {
        let defaults = vec![preselect_all; options.len()];
        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt(message)
            .items(options)
            .defaults(&defaults)
            .interact()
            .map_err(prompt_error)?;
        Ok(picked.into_iter().map(|i| options[i].clone()).collect())
    }

    fn prompt_text(&self, message: &str, default: &str, validator: &Validator) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .validate_with(|value: &String| validator(value));
        if !default.is_empty() {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(prompt_error)
    }

    fn prompt_secret(&self, message: &str) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(message)
            .interact()
            .map_err(prompt_error)
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(prompt_error)
    }
}
