//! # orc-vcs
//!
//! Version-control plumbing for the orchestra change pipeline: a
//! [`CommandRunner`] seam over process execution and the [`GitProbe`] that
//! decides whether a session's working directory is a git repository.

pub mod error;
pub mod probe;
pub mod runner;

pub use error::VcsError;
pub use probe::{GitProbe, DEFAULT_PROBE_TIMEOUT};
pub use runner::{CommandOutput, CommandRunner, TokioRunner};
