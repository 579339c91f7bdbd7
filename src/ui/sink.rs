//! Terminal rendering of the provisioning log.

use indicatif::ProgressBar;

use super::output::OutputMode;
use super::theme::RunwayTheme;
use crate::session::{LogLine, LogSink};

const MAX_LINE_WIDTH: usize = 72;

/// [`LogSink`] that draws log lines around a spinner.
///
/// Verbose mode prints every line above the spinner. Normal mode shows the
/// latest line as the spinner message. Quiet mode drops everything.
pub struct TerminalSink {
    bar: ProgressBar,
    mode: OutputMode,
    theme: RunwayTheme,
    base_message: String,
}

impl TerminalSink {
    pub fn new(bar: ProgressBar, mode: OutputMode, base_message: impl Into<String>) -> Self {
        Self {
            bar,
            mode,
            theme: RunwayTheme::detect(),
            base_message: base_message.into(),
        }
    }

    pub fn with_theme(mut self, theme: RunwayTheme) -> Self {
        self.theme = theme;
        self
    }
}

impl LogSink for TerminalSink {
    fn line(&self, line: &LogLine) {
        let text = line.text.trim_end();
        if text.is_empty() {
            return;
        }
        match self.mode {
            OutputMode::Verbose => {
                let rendered = format!(
                    "{} {}",
                    self.theme.dim.apply_to(line.timestamp.format("%H:%M:%S")),
                    text
                );
                if self.bar.is_hidden() {
                    eprintln!("{}", rendered);
                } else {
                    self.bar.println(rendered);
                }
            }
            OutputMode::Normal => {
                self.bar.set_message(format!(
                    "{} {}",
                    self.base_message,
                    self.theme.dim.apply_to(format!("» {}", truncate(text)))
                ));
            }
            OutputMode::Quiet => {}
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_LINE_WIDTH {
        let head: String = text.chars().take(MAX_LINE_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
