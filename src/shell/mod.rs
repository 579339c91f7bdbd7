//! Child process execution.

pub mod mock;
pub mod process;

pub use mock::{MockResponse, MockRunner};
pub use process::{
    CommandResult, CommandSpec, OutputLine, OutputTail, ProcessRunner, SystemRunner,
};
