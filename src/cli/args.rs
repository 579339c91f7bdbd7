//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// runway - Python runtime and package provisioning for editor tooling.
#[derive(Debug, Parser)]
#[command(name = "runway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides .runway/config.yml discovery)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Python interpreter to try before any other source
    #[arg(long, global = true, env = "RUNWAY_PYTHON")]
    pub python: Option<PathBuf>,

    /// Never create the private environment
    #[arg(long, global = true)]
    pub no_self_provision: bool,

    /// Print every provisioning log line
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final status
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a runtime and install missing packages (default)
    Ensure(EnsureArgs),

    /// Discard the cached runtime and private environment, then provision again
    Reinstall(EnsureArgs),

    /// Show the runtime and each package's import status without installing
    Status(StatusArgs),

    /// Print the interpreter path of a ready runtime
    Which,

    /// Remove the private environment
    Clean,
}

/// Arguments for `ensure` and `reinstall`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct EnsureArgs {
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `status` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StatusArgs {
    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}
