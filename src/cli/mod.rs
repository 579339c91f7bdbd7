//! Command-line interface for runway.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, EnsureArgs, StatusArgs};
pub use commands::{Command, CommandContext, CommandDispatcher, CommandResult};
