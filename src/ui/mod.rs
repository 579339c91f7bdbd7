//! Terminal presentation for the CLI.
//!
//! - [`RunwayTheme`] styles status lines
//! - [`ProgressSpinner`] shows that a session is working
//! - [`TerminalSink`] renders the provisioning log as it is written

pub mod output;
pub mod sink;
pub mod spinner;
pub mod theme;

pub use output::OutputMode;
pub use sink::TerminalSink;
pub use spinner::ProgressSpinner;
pub use theme::{should_use_colors, RunwayTheme};
