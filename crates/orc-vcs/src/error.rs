// error.rs — Error types for external command execution.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    /// The program could not be started at all.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("'{program}' timed out after {}ms", .after.as_millis())]
    Timeout { program: String, after: Duration },
}
