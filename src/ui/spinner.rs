//! Progress spinner shown while a session provisions.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::theme::RunwayTheme;

/// A spinner for one long-running operation.
pub struct ProgressSpinner {
    bar: ProgressBar,
    theme: RunwayTheme,
}

impl ProgressSpinner {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.magenta} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Self {
            bar,
            theme: RunwayTheme::detect(),
        }
    }

    /// A spinner that draws nothing.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            theme: RunwayTheme::plain(),
        }
    }

    /// A clone of the underlying bar, for log sinks running on other tasks.
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }

    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    pub fn finish_success(&self, msg: &str) {
        self.finish(self.theme.format_success(msg));
    }

    pub fn finish_warning(&self, msg: &str) {
        self.finish(self.theme.format_warning(msg));
    }

    pub fn finish_error(&self, msg: &str) {
        self.finish(self.theme.format_error(msg));
    }

    /// Remove the spinner without leaving a line behind.
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }

    fn finish(&self, line: String) {
        if self.bar.is_hidden() {
            self.bar.finish_and_clear();
            return;
        }
        self.bar.set_style(
            ProgressStyle::default_spinner()
                .template("{msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        self.bar.finish_with_message(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_spinner_finishes_quietly() {
        let spinner = ProgressSpinner::hidden();
        spinner.set_message("Resolving");
        spinner.finish_success("Ready");
        assert!(spinner.bar().is_finished());
    }

    #[test]
    fn visible_spinner_finishes_with_message() {
        let spinner = ProgressSpinner::new("Resolving");
        spinner.finish_error("Failed");
        assert!(spinner.bar().is_finished());
    }
}
