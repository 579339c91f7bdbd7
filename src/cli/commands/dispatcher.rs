//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform exit codes
//! - [`CommandDispatcher`] for loading config and routing subcommands

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::args::{Cli, Commands, EnsureArgs};
use crate::config::{load_config, validate, RunwayConfig};
use crate::error::Result;
use crate::runtime::ActiveVirtualEnv;
use crate::session::{LogSink, ProvisioningSession, SessionBuilder};
use crate::ui::{OutputMode, ProgressSpinner, RunwayTheme};

use super::display::{EXIT_CONFIG, EXIT_SUCCESS};

/// A CLI subcommand.
#[async_trait]
pub trait Command {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: EXIT_SUCCESS,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == EXIT_SUCCESS {
            Self::success()
        } else {
            Self::failure(exit_code)
        }
    }
}

/// Everything a command needs: merged configuration and output settings.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: RunwayConfig,
    pub mode: OutputMode,
    pub theme: RunwayTheme,
}

impl CommandContext {
    pub fn new(config: RunwayConfig, mode: OutputMode, theme: RunwayTheme) -> Self {
        Self {
            config,
            mode,
            theme,
        }
    }

    /// A session builder carrying the configuration, the active virtualenv
    /// as host interpreter, and `sink` for the provisioning log.
    pub fn session(&self, sink: Arc<dyn LogSink>) -> SessionBuilder {
        ProvisioningSession::builder()
            .config(&self.config)
            .host(Arc::new(ActiveVirtualEnv::from_env()))
            .sink(sink)
    }

    /// A spinner, hidden in quiet mode or when stdout carries JSON.
    pub fn spinner(&self, message: &str, json: bool) -> ProgressSpinner {
        if json || !self.mode.shows_spinner() {
            ProgressSpinner::hidden()
        } else {
            ProgressSpinner::new(message)
        }
    }

    /// Output mode for the provisioning log, quiet when stdout carries JSON.
    pub fn log_mode(&self, json: bool) -> OutputMode {
        if json {
            OutputMode::Quiet
        } else {
            self.mode
        }
    }
}

/// Drive `work` to completion, cancelling `session` on Ctrl-C.
///
/// The future is still awaited after cancellation so the session can kill
/// its child process and record the cancelled result.
pub async fn interruptible<F>(session: &ProvisioningSession, work: F) -> F::Output
where
    F: Future,
{
    tokio::pin!(work);
    tokio::select! {
        output = &mut work => output,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted; cancelling provisioning");
            session.cancel();
            work.await
        }
    }
}

/// Routes CLI subcommands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
}

impl CommandDispatcher {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Load configuration, apply CLI overrides, and run the subcommand.
    pub async fn dispatch(&self, cli: &Cli) -> Result<CommandResult> {
        let theme = RunwayTheme::detect();
        let mut config = load_config(&self.project_root, cli.config.as_deref())?;
        apply_overrides(&mut config, cli);

        if let Err(e) = validate(&config) {
            eprintln!("{}", theme.format_error(&e.to_string()));
            return Ok(CommandResult::failure(EXIT_CONFIG));
        }
        tracing::debug!("Effective config: {:?}", config);

        let ctx = CommandContext::new(config, OutputMode::from_flags(cli.verbose, cli.quiet), theme);
        match &cli.command {
            None => super::ensure::EnsureCommand::new(EnsureArgs::default()).execute(&ctx).await,
            Some(Commands::Ensure(args)) => {
                super::ensure::EnsureCommand::new(args.clone()).execute(&ctx).await
            }
            Some(Commands::Reinstall(args)) => {
                super::ensure::EnsureCommand::reinstall(args.clone())
                    .execute(&ctx)
                    .await
            }
            Some(Commands::Status(args)) => {
                super::status::StatusCommand::new(args.clone()).execute(&ctx).await
            }
            Some(Commands::Which) => super::which::WhichCommand.execute(&ctx).await,
            Some(Commands::Clean) => super::clean::CleanCommand.execute(&ctx).await,
        }
    }
}

/// Command-line flags take precedence over every config file.
fn apply_overrides(config: &mut RunwayConfig, cli: &Cli) {
    if let Some(python) = &cli.python {
        config.runtime.path = Some(python.clone());
    }
    if cli.no_self_provision {
        config.runtime.self_provision = false;
    }
}
