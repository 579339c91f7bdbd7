//! `runway status`: report the runtime and package imports without
//! creating or installing anything.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::cli::args::StatusArgs;
use crate::error::Result;
use crate::provision::PackageStatus;
use crate::session::{FailureReason, ProvisioningResult};
use crate::ui::{RunwayTheme, TerminalSink};

use super::dispatcher::{interruptible, Command, CommandContext, CommandResult};
use super::display::{self, EXIT_DEGRADED, EXIT_SUCCESS};

const KEY_WIDTH: usize = 11;

pub struct StatusCommand {
    args: StatusArgs,
}

impl StatusCommand {
    pub fn new(args: StatusArgs) -> Self {
        Self { args }
    }
}

#[async_trait]
impl Command for StatusCommand {
    async fn execute(&self, ctx: &CommandContext) -> Result<CommandResult> {
        let message = "Checking Python runtime";
        let spinner = ctx.spinner(message, self.args.json);
        let sink = TerminalSink::new(spinner.bar(), ctx.log_mode(self.args.json), message)
            .with_theme(ctx.theme.clone());
        let session = ctx.session(Arc::new(sink)).reuse_only(true).build();

        let runtime = match interruptible(&session, session.resolve_runtime()).await {
            Ok(runtime) => runtime,
            Err(e) => {
                let reason = FailureReason::from(&e);
                if self.args.json {
                    spinner.clear();
                    println!(
                        "{:#}",
                        display::result_json(&ProvisioningResult::Failed(reason.clone()))
                    );
                } else {
                    display::report(&spinner, &ctx.theme, &ProvisioningResult::Failed(reason.clone()));
                }
                return Ok(CommandResult::failure(display::failure_exit_code(&reason)));
            }
        };

        spinner.set_message("Checking packages");
        let packages = interruptible(&session, session.package_report(&runtime)).await;
        spinner.clear();

        let env_dir = session.env_dir();
        if self.args.json {
            println!(
                "{:#}",
                json!({
                    "runtime": runtime,
                    "env_dir": env_dir,
                    "env_exists": env_dir.exists(),
                    "packages": packages,
                })
            );
        } else {
            let theme = &ctx.theme;
            println!("{}", theme.format_key_value("Runtime", &runtime.to_string(), KEY_WIDTH));
            println!(
                "{}",
                theme.format_key_value(
                    "Private env",
                    &format!(
                        "{} ({})",
                        env_dir.display(),
                        if env_dir.exists() { "present" } else { "absent" }
                    ),
                    KEY_WIDTH
                )
            );
            println!("{}", theme.key.apply_to("Packages:"));
            for status in &packages {
                println!("  {}", package_line(theme, status));
            }
        }

        let code = if packages.iter().all(|p| p.satisfied) {
            EXIT_SUCCESS
        } else {
            EXIT_DEGRADED
        };
        Ok(CommandResult::from_exit_code(code))
    }
}

fn package_line(theme: &RunwayTheme, status: &PackageStatus) -> String {
    if status.satisfied {
        let version = status.installed_version.as_deref().unwrap_or("unknown version");
        theme.format_success(&format!(
            "{} {} (import {})",
            status.name, version, status.import_name
        ))
    } else {
        theme.format_error(&format!(
            "{} not importable (import {})",
            status.name, status.import_name
        ))
    }
}
