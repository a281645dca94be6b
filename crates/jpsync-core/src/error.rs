use thiserror::Error;

/// Startup configuration failures. All of these are fatal: the process exits
/// with code 2 before any job runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
