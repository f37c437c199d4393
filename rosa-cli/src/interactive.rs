//! Interactive prompts for values that were not given as flags

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select};

/// Source of answers to interactive questions
pub trait Prompter: Send + Sync {
    fn get_bool(&self, question: &str, default: bool) -> Result<bool>;

    fn get_int(&self, question: &str, default: i32) -> Result<i32>;

    /// One of `options`, `default` preselected
    fn get_option(&self, question: &str, options: &[&str], default: &str) -> Result<String>;
}

/// Prompts on the controlling terminal
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn get_bool(&self, question: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(default)
            .interact()
            .with_context(|| format!("Expected a valid value for '{}'", question))
    }

    fn get_int(&self, question: &str, default: i32) -> Result<i32> {
        Input::<i32>::new()
            .with_prompt(question)
            .default(default)
            .interact_text()
            .with_context(|| format!("Expected a valid number for '{}'", question))
    }

    fn get_option(&self, question: &str, options: &[&str], default: &str) -> Result<String> {
        let index = Select::new()
            .with_prompt(question)
            .items(options)
            .default(options.iter().position(|o| *o == default).unwrap_or(0))
            .interact()
            .with_context(|| format!("Expected a valid option for '{}'", question))?;
        Ok(options[index].to_string())
    }
}
