// error.rs — Error types for the pipeline gateway.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// An explicitly named config file does not exist.
    #[error("config file not found: {path}")]
    ConfigNotFound { path: String },

    /// The config file could not be parsed.
    #[error("invalid config {path}: {reason}")]
    InvalidConfig { path: String, reason: String },

    /// The tool gate could not be built from config.
    #[error("tool gate error: {0}")]
    Policy(#[from] orc_policy::PolicyError),

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },
}
