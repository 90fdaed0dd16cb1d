// error.rs — Error types for the tool gate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    /// An allow-list entry is not a valid glob pattern.
    #[error("invalid tool pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
