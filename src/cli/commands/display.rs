//! Shared rendering of provisioning results and exit codes.

use serde_json::{json, Value};

use crate::session::{FailureReason, ProvisioningResult};
use crate::ui::{ProgressSpinner, RunwayTheme};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_DEGRADED: i32 = 3;
pub const EXIT_CANCELLED: i32 = 130;

/// Process exit code for a provisioning result.
pub fn exit_code(result: &ProvisioningResult) -> i32 {
    match result {
        ProvisioningResult::Ready(_) => EXIT_SUCCESS,
        ProvisioningResult::Degraded(..) => EXIT_DEGRADED,
        ProvisioningResult::Failed(reason) => failure_exit_code(reason),
    }
}

pub fn failure_exit_code(reason: &FailureReason) -> i32 {
    if reason.is_cancellation() {
        EXIT_CANCELLED
    } else {
        EXIT_FAILED
    }
}

/// Machine-readable form of a result.
pub fn result_json(result: &ProvisioningResult) -> Value {
    match result {
        ProvisioningResult::Ready(runtime) => json!({
            "status": result.label(),
            "runtime": runtime,
        }),
        ProvisioningResult::Degraded(runtime, missing) => json!({
            "status": result.label(),
            "runtime": runtime,
            "missing": missing,
        }),
        ProvisioningResult::Failed(reason) => json!({
            "status": result.label(),
            "failure": reason,
        }),
    }
}

/// One-line summary used as the spinner's final message.
pub fn summary(result: &ProvisioningResult) -> String {
    match result {
        ProvisioningResult::Ready(runtime) => format!("Ready: {}", runtime),
        ProvisioningResult::Degraded(runtime, missing) => format!(
            "Degraded: {} is missing {}",
            runtime,
            missing.join(", ")
        ),
        ProvisioningResult::Failed(reason) if reason.is_cancellation() => "Cancelled".to_string(),
        ProvisioningResult::Failed(_) => "Provisioning failed".to_string(),
    }
}

/// What the user can do next, if anything.
pub fn hint(result: &ProvisioningResult) -> Option<&'static str> {
    match result {
        ProvisioningResult::Ready(_) => None,
        ProvisioningResult::Degraded(..) => {
            Some("Enable install.auto_install or run `runway reinstall` to install the missing packages")
        }
        ProvisioningResult::Failed(reason) => match reason {
            FailureReason::NoRuntimeFound => {
                Some("Pass --python, set RUNWAY_PYTHON, or enable runtime.self_provision")
            }
            FailureReason::BootstrapUnavailable { .. } => {
                Some("Install uv or Python 3, or pass --python with an existing interpreter")
            }
            FailureReason::EnvironmentCreationFailed { .. }
            | FailureReason::InstallFailed { .. }
            | FailureReason::AuditInconsistent { .. } => {
                Some("Run `runway reinstall` to rebuild the environment")
            }
            _ => None,
        },
    }
}

/// Finish the spinner with the result and print failure details.
///
/// When the spinner is hidden the summary goes to stderr instead, so
/// stdout stays free for `which` and `--json`.
pub fn report(spinner: &ProgressSpinner, theme: &RunwayTheme, result: &ProvisioningResult) {
    let line = summary(result);
    let hidden = spinner.bar().is_hidden();
    match result {
        ProvisioningResult::Ready(_) => {
            if hidden {
                eprintln!("{}", theme.format_success(&line));
            } else {
                spinner.finish_success(&line);
            }
        }
        ProvisioningResult::Degraded(..) => {
            if hidden {
                eprintln!("{}", theme.format_warning(&line));
            } else {
                spinner.finish_warning(&line);
            }
        }
        ProvisioningResult::Failed(reason) => {
            if hidden {
                eprintln!("{}", theme.format_error(&line));
            } else {
                spinner.finish_error(&line);
            }
            if !reason.is_cancellation() {
                eprintln!("{}", reason);
            }
        }
    }
    if let Some(hint) = hint(result) {
        eprintln!("{}", theme.format_hint(hint));
    }
}
