// error.rs — Error types for the pipeline subsystem.

use thiserror::Error;

use crate::phase::{join_aliases, Alias, Phase};

/// Why an `advance` request was refused.
///
/// These are business-rule outcomes, not failures of the process: the host
/// renders them as `ERROR: ...` strings for the calling agent and leaves the
/// pipeline untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdvanceError {
    /// The requested alias does not exist.
    #[error(
        "unknown transition '{given}'. Valid targets: {}",
        join_aliases(&Alias::ALL)
    )]
    UnknownAlias { given: String },

    /// The alias exists but its target is not reachable from the current phase.
    #[error(
        "cannot '{alias}' from {}. Valid transitions: {}",
        .from.label(),
        join_aliases(.valid)
    )]
    Unreachable {
        alias: Alias,
        from: Phase,
        valid: Vec<Alias>,
    },

    /// `iterate` was requested after the retry budget was spent.
    #[error("iteration limit reached ({max}/{max}). Only 'report' is available now")]
    IterationLimit { max: u32 },

    /// `report` was requested before the changes were inspected with `git diff`.
    #[error(
        "run `git diff` to inspect the dispatched changes before reporting. \
         The diff must be reviewed in the current review cycle"
    )]
    GitDiffRequired,
}

/// Errors raised by the pipeline's I/O collaborators.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize a log record.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
