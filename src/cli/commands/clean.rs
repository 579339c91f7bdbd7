//! `runway clean`: remove the private environment.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::session::NullSink;

use super::dispatcher::{Command, CommandContext, CommandResult};

pub struct CleanCommand;

#[async_trait]
impl Command for CleanCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandResult> {
        let session = ctx.session(Arc::new(NullSink)).build();
        let dir = session.env_dir().to_path_buf();

        if !dir.exists() {
            println!(
                "{}",
                ctx.theme
                    .format_skipped(&format!("Nothing to remove at {}", dir.display()))
            );
            return Ok(CommandResult::success());
        }

        session.clean().await?;
        println!(
            "{}",
            ctx.theme
                .format_success(&format!("Removed {}", dir.display()))
        );
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunwayConfig;
    use crate::ui::{OutputMode, RunwayTheme};
    use tempfile::TempDir;

    fn context(storage: &std::path::Path) -> CommandContext {
        let mut config = RunwayConfig::default();
        config.storage.dir = Some(storage.to_path_buf());
        CommandContext::new(config, OutputMode::Quiet, RunwayTheme::plain())
    }

    #[tokio::test]
    async fn removes_existing_environment() {
        let temp = TempDir::new().unwrap();
        let env = temp.path().join("envs").join("python");
        std::fs::create_dir_all(env.join("bin")).unwrap();

        let result = CleanCommand.execute(&context(temp.path())).await.unwrap();
        assert!(result.success);
        assert!(!env.exists());
    }

    #[tokio::test]
    async fn missing_environment_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let result = CleanCommand.execute(&context(temp.path())).await.unwrap();
        assert!(result.success);
    }
}
