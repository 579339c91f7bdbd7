//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed by
//! [`CommandDispatcher`]. Every command builds its own
//! [`ProvisioningSession`](crate::session::ProvisioningSession) from the
//! shared [`CommandContext`].

pub mod clean;
pub mod dispatcher;
pub mod display;
pub mod ensure;
pub mod status;
pub mod which;

pub use dispatcher::{interruptible, Command, CommandContext, CommandDispatcher, CommandResult};
