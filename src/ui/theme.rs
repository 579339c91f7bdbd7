//! Visual theme and styling.

use console::Style;

/// runway's visual theme.
#[derive(Debug, Clone)]
pub struct RunwayTheme {
    /// Success messages (green).
    pub success: Style,
    /// Warnings and degraded results (orange).
    pub warning: Style,
    /// Errors (red bold).
    pub error: Style,
    /// Running elements (magenta).
    pub info: Style,
    /// Secondary text and streamed tool output.
    pub dim: Style,
    /// Headers (magenta bold).
    pub header: Style,
    /// Keys in key-value displays (bold).
    pub key: Style,
    /// Actionable hints (magenta dim).
    pub hint: Style,
}

impl Default for RunwayTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl RunwayTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().magenta(),
            dim: Style::new().dim(),
            header: Style::new().bold().magenta(),
            key: Style::new().bold(),
            hint: Style::new().magenta().dim(),
        }
    }

    /// A theme without colors, for non-TTY output or `NO_COLOR`.
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            header: Style::new(),
            key: Style::new(),
            hint: Style::new(),
        }
    }

    /// Pick [`new`](Self::new) or [`plain`](Self::plain) for the current terminal.
    pub fn detect() -> Self {
        if should_use_colors() {
            Self::new()
        } else {
            Self::plain()
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_skipped(&self, msg: &str) -> String {
        format!("{}", self.dim.apply_to(format!("○ {}", msg)))
    }

    /// Format a `key: value` row with the key padded to `width`.
    pub fn format_key_value(&self, key: &str, value: &str, width: usize) -> String {
        format!(
            "{} {}",
            self.key.apply_to(format!("{:<width$}", format!("{}:", key), width = width + 1)),
            value
        )
    }

    pub fn format_hint(&self, msg: &str) -> String {
        format!("{}", self.hint.apply_to(format!("→ {}", msg)))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_formats_icons() {
        let theme = RunwayTheme::plain();
        assert_eq!(theme.format_success("Ready"), "✓ Ready");
        assert_eq!(theme.format_warning("Degraded"), "⚠ Degraded");
        assert_eq!(theme.format_error("Failed"), "✗ Failed");
        assert_eq!(theme.format_skipped("Skipped"), "○ Skipped");
        assert_eq!(theme.format_hint("Run runway reinstall"), "→ Run runway reinstall");
    }

    #[test]
    fn key_value_pads_key() {
        let theme = RunwayTheme::plain();
        assert_eq!(theme.format_key_value("Path", "/usr/bin/python3", 7), "Path:    /usr/bin/python3");
    }

    #[test]
    fn default_matches_new() {
        assert_eq!(
            RunwayTheme::default().format_success("x"),
            RunwayTheme::new().format_success("x")
        );
    }
}
