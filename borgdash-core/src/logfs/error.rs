use std::path::PathBuf;

use borgdash_config::ConfigError;
use thiserror::Error;

/// Failures surfaced by [`LogFsBridge`](super::LogFsBridge).
#[derive(Debug, Error)]
pub enum LogFsError {
    /// Log name would leave the mount point.
    #[error("log file name {name:?} must be a plain relative path")]
    InvalidLogName {
        /// Rejected name.
        name: String,
    },
    /// Temporary mount directory could not be created.
    #[error("failed to prepare mount point")]
    MountPoint {
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Mount or unmount command could not be spawned.
    #[error("failed to run {program}")]
    Command {
        /// Program that failed to spawn.
        program: String,
        /// Spawn failure.
        #[source]
        source: std::io::Error,
    },
    /// Mount command exited unsuccessfully.
    #[error("mounting {target} on {} failed ({status}): {stderr}", mount_point.display())]
    MountFailed {
        /// Remote target as requested.
        target: String,
        /// Directory the mount was attempted on.
        mount_point: PathBuf,
        /// Exit status description.
        status: String,
        /// Command error output.
        stderr: String,
    },
    /// Mount lifetime could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
