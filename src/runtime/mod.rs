//! Runtime discovery and validation.
//!
//! - [`CommandResolver`] maps command names to executables on the lookup path
//! - [`VersionProbe`] asks a candidate for its version and checks the minimum
//! - [`CandidateChain`] tries each [`CandidateSource`] in priority order

pub mod chain;
pub mod descriptor;
pub mod host;
pub mod resolver;
pub mod version;

pub use chain::{
    CandidateChain, CandidateSource, ConfiguredPathSource, HostInterpreterSource,
    SelfProvisionedSource, SystemCommandSource,
};
pub use descriptor::{RuntimeDescriptor, RuntimeOrigin};
pub use host::{ActiveVirtualEnv, HostInterpreter, NoHost};
pub use resolver::CommandResolver;
pub use version::{
    parse_version_output, MinimumVersion, RuntimeVersion, VersionProbe, DEFAULT_PROBE_TIMEOUT,
};
