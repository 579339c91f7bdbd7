//! `runway which`: print the interpreter path and nothing else.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::session::{NullSink, ProvisioningResult};

use super::dispatcher::{interruptible, Command, CommandContext, CommandResult};
use super::display;

pub struct WhichCommand;

#[async_trait]
impl Command for WhichCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandResult> {
        let session = ctx.session(Arc::new(NullSink)).build();
        let result = interruptible(&session, session.ensure_runtime()).await;

        match &result {
            ProvisioningResult::Ready(runtime) => println!("{}", runtime.path.display()),
            other => eprintln!("{}", ctx.theme.format_error(&display::summary(other))),
        }
        if let ProvisioningResult::Failed(reason) = &result {
            if !reason.is_cancellation() {
                eprintln!("{}", reason);
            }
        }

        Ok(CommandResult::from_exit_code(display::exit_code(&result)))
    }
}
