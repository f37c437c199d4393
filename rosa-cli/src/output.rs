//! User-facing output
//!
//! Every message a command prints goes through [`Reporter`] so that tests can
//! capture it instead of writing to the terminal.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::IsTerminal;
use std::sync::Mutex;
use std::time::Duration;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Lenient parse used for the config file; unknown names fall back to a table
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Table,
        }
    }
}

pub struct Reporter {
    captured: Option<Mutex<Vec<String>>>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Reporter {
    pub fn stdout() -> Self {
        Self { captured: None }
    }

    /// Reporter that records lines instead of printing them
    pub fn capture() -> Self {
        Self {
            captured: Some(Mutex::new(Vec::new())),
        }
    }

    /// Lines recorded so far (empty for a stdout reporter)
    pub fn captured(&self) -> Vec<String> {
        match &self.captured {
            Some(lines) => lines.lock().map(|l| l.clone()).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// True when output goes to an interactive terminal
    pub fn is_terminal(&self) -> bool {
        self.captured.is_none() && std::io::stdout().is_terminal()
    }

    fn record(&self, line: String) -> bool {
        match &self.captured {
            Some(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line);
                }
                true
            }
            None => false,
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        if !self.record(format!("ℹ {}", message)) {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        if !self.record(format!("✓ {}", message)) {
            println!("{} {}", "✓".green().bold(), message.green());
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        if !self.record(format!("⚠ {}", message)) {
            eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
        }
    }

    pub fn error(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        if !self.record(format!("✗ {}", message)) {
            eprintln!("{} {}", "✗".red().bold(), message.red());
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        tracing::debug!("{}", message.as_ref());
    }

    /// Raw text on stdout, e.g. shell commands meant to be copied
    pub fn emit(&self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !self.record(text.to_string()) {
            println!("{}", text);
        }
    }

    /// Print rows as a table, JSON or YAML
    pub fn print_output<T: Tabled + Serialize>(
        &self,
        rows: Vec<T>,
        format: OutputFormat,
    ) -> anyhow::Result<()> {
        match format {
            OutputFormat::Table => {
                if rows.is_empty() {
                    self.warn("No results found");
                } else {
                    self.emit(Table::new(rows).to_string());
                }
            }
            OutputFormat::Json | OutputFormat::Yaml => self.print_single(&rows, format)?,
        }
        Ok(())
    }

    /// Print one value as JSON or YAML; tables fall back to JSON
    pub fn print_single<T: Serialize>(&self, data: &T, format: OutputFormat) -> anyhow::Result<()> {
        match format {
            OutputFormat::Table | OutputFormat::Json => {
                self.emit(serde_json::to_string_pretty(data)?)
            }
            OutputFormat::Yaml => self.emit(serde_yaml::to_string(data)?),
        }
        Ok(())
    }

    /// Wait for `delay`, showing a spinner when attached to a terminal
    pub async fn wait_with_spinner(&self, message: &str, delay: Duration) {
        if !self.is_terminal() {
            self.debug(message);
            tokio::time::sleep(delay).await;
            return;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        tokio::time::sleep(delay).await;
        spinner.finish_and_clear();
    }
}
