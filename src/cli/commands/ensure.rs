//! `runway ensure` and `runway reinstall`.

use async_trait::async_trait;
use std::sync::Arc;

use crate::cli::args::EnsureArgs;
use crate::error::Result;
use crate::ui::TerminalSink;

use super::dispatcher::{interruptible, Command, CommandContext, CommandResult};
use super::display;

pub struct EnsureCommand {
    args: EnsureArgs,
    reinstall: bool,
}

impl EnsureCommand {
    pub fn new(args: EnsureArgs) -> Self {
        Self {
            args,
            reinstall: false,
        }
    }

    /// Discard cached state and the private environment first.
    pub fn reinstall(args: EnsureArgs) -> Self {
        Self {
            args,
            reinstall: true,
        }
    }

    fn message(&self) -> &'static str {
        if self.reinstall {
            "Reinstalling Python runtime"
        } else {
            "Provisioning Python runtime"
        }
    }
}

#[async_trait]
impl Command for EnsureCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandResult> {
        let spinner = ctx.spinner(self.message(), self.args.json);
        let sink = TerminalSink::new(spinner.bar(), ctx.log_mode(self.args.json), self.message())
            .with_theme(ctx.theme.clone());
        let session = ctx.session(Arc::new(sink)).build();

        let result = if self.reinstall {
            interruptible(&session, session.invalidate_and_reprovision()).await
        } else {
            interruptible(&session, session.ensure_runtime()).await
        };

        if self.args.json {
            spinner.clear();
            println!("{:#}", display::result_json(&result));
        } else {
            display::report(&spinner, &ctx.theme, &result);
        }

        Ok(CommandResult::from_exit_code(display::exit_code(&result)))
    }
}
