use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by [`ConfigResolver`](super::ConfigResolver).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither layer nor the built-in fallback could be loaded.
    #[error(
        "no configuration available: default source {default} and override {} could not be loaded",
        override_path.display()
    )]
    Unavailable {
        /// Default candidates that were tried.
        default: String,
        /// Override location that was tried.
        override_path: PathBuf,
    },
    /// The document chosen as base does not satisfy the schema.
    #[error("resolved configuration does not match the expected schema")]
    Invalid {
        /// Schema mismatch reported by serde.
        #[source]
        source: serde_yaml::Error,
    },
    /// The override document could not be saved.
    #[error("failed to write configuration to {}", path.display())]
    Write {
        /// Override location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}
