//! Environment variable names, fixed locations and built-in defaults.

use std::time::Duration;

/// Environment variable naming the editable override document.
pub const CONFIG_PATH_ENV: &str = "BORGDASH_CONFIG";
/// Environment variable naming the immutable default document.
pub const DEFAULT_CONFIG_PATH_ENV: &str = "BORGDASH_DEFAULT_CONFIG";

/// Override location used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_OVERRIDE_PATH: &str = "/etc/config.yaml";
/// Default document location used when [`DEFAULT_CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_DEFAULTS_PATH: &str = "/etc/config_default.yaml";
/// Default document location inside a source checkout.
pub const BUILD_TREE_DEFAULTS_PATH: &str = "../etc/config_default.yaml";

/// Hard limit on a single rescan run.
pub const DEFAULT_RESCAN_TIMEOUT_MS: u64 = 300_000;
/// Lifetime of a remote log mount when the configuration does not set one.
pub const DEFAULT_MOUNT_TTL: Duration = Duration::from_millis(600_000);

/// Reporter executable launched by a rescan.
pub const DEFAULT_REPORTER_PATH: &str = "borgdash-reporter";
/// JSON report written by the reporter.
pub const DEFAULT_REPORT_PATH: &str = "/tmp/bordash.json";
/// `borg` binary used by the reporter.
pub const DEFAULT_BORG_PATH: &str = "/usr/bin/borg";
/// Deduplication cache kept by the reporter.
pub const DEFAULT_DEDUPE_PATH: &str = "/tmp/dedupe";
/// Crontab file holding the reporter schedule.
pub const DEFAULT_CRONTAB_PATH: &str = "/tmp/crontab";
/// Root of the per-repository backup logs.
pub const DEFAULT_LOGS_BASEDIR: &str = "/logs";
/// Root of the local borg repositories.
pub const DEFAULT_REPOS_BASEDIR: &str = "/repos";
