//! Server-side engines behind the borgdash web surface.
//!
//! - [`rescan`] supervises the external reporter process: one run at a time,
//!   incremental output capture, cooperative stop and a hard timeout.
//! - [`logfs`] turns repository log locations into local paths, mounting
//!   `sshfs://` targets on demand and releasing them after a fixed lifetime.
//!
//! Both read their tunables from a shared
//! [`ConfigResolver`](borgdash_config::ConfigResolver).

/// Remote log mounts.
pub mod logfs;
/// Reporter process supervision.
pub mod rescan;

pub use logfs::{
    CommandOutput, LogFsBridge, LogFsError, MountDriver, SshfsDriver,
};
pub use rescan::{
    RescanError, RescanSupervisor, ScanState, ScanStatus, StartOutcome,
};
