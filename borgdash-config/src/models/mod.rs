use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize, Serializer};
use serde_yaml::Value;

use crate::constants::{
    DEFAULT_BORG_PATH, DEFAULT_CRONTAB_PATH, DEFAULT_DEDUPE_PATH,
    DEFAULT_LOGS_BASEDIR, DEFAULT_MOUNT_TTL, DEFAULT_REPORT_PATH,
    DEFAULT_REPORTER_PATH, DEFAULT_REPOS_BASEDIR, DEFAULT_RESCAN_TIMEOUT_MS,
};

/// Typed schema every resolved configuration must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Settings for the web process.
    pub dashboard: DashboardConfig,
    /// Settings shared with the reporter.
    pub reporter: ReporterConfig,
    /// Monitored repositories by name.
    #[serde(default)]
    pub report: BTreeMap<String, RepoConfig>,
}

/// Settings consumed by the web process itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DashboardConfig {
    /// Executable launched by a rescan.
    pub reporter_path: String,
    /// Arguments passed to the reporter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reporter_args: Vec<String>,
    /// Hard limit on one rescan run.
    #[serde(default = "default_rescan_timeout_ms")]
    pub rescan_timeout_ms: u64,
    /// Lifetime of a remote log mount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sshfs_mount_uptime_ms: Option<u64>,
}

impl DashboardConfig {
    /// [`Self::rescan_timeout_ms`] as a duration.
    pub fn rescan_timeout(&self) -> Duration {
        Duration::from_millis(self.rescan_timeout_ms)
    }

    /// Zero and absent both mean "use the built-in lifetime".
    pub fn mount_ttl(&self) -> Duration {
        match self.sshfs_mount_uptime_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => DEFAULT_MOUNT_TTL,
        }
    }
}

fn default_rescan_timeout_ms() -> u64 {
    DEFAULT_RESCAN_TIMEOUT_MS
}

/// Settings shared with the reporter executable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReporterConfig {
    /// JSON report the dashboard reads.
    pub report_path: String,
    /// `borg` binary.
    pub borg_path: String,
    /// Crontab file the schedule is written to.
    pub crontab_path: String,
    /// Deduplication cache file.
    pub dedupe_path: String,
    /// Root of the backup logs.
    pub logs_basedir: String,
    /// Root of the local repositories.
    pub repos_basedir: String,
    /// Notification target for finished reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordConfig>,
}

/// Discord webhook notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiscordConfig {
    /// Webhook URL.
    pub webhook: String,
    /// Display name used for posted messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_user: Option<String>,
    /// Message template for a report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Message template for one repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_device: Option<String>,
}

/// One monitored borg repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepoConfig {
    /// Local path or remote URL of the repository.
    pub repo_path: String,
    /// Local directory or `sshfs://` target holding the repository logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
    /// Repository passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_pwd: Option<String>,
    /// Backup script that writes to this repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl Settings {
    /// Structure used when no default document can be found or parsed.
    pub fn builtin() -> Self {
        Self {
            dashboard: DashboardConfig {
                reporter_path: DEFAULT_REPORTER_PATH.to_string(),
                reporter_args: Vec::new(),
                rescan_timeout_ms: DEFAULT_RESCAN_TIMEOUT_MS,
                sshfs_mount_uptime_ms: Some(
                    DEFAULT_MOUNT_TTL.as_millis() as u64,
                ),
            },
            reporter: ReporterConfig {
                report_path: DEFAULT_REPORT_PATH.to_string(),
                borg_path: DEFAULT_BORG_PATH.to_string(),
                crontab_path: DEFAULT_CRONTAB_PATH.to_string(),
                dedupe_path: DEFAULT_DEDUPE_PATH.to_string(),
                logs_basedir: DEFAULT_LOGS_BASEDIR.to_string(),
                repos_basedir: DEFAULT_REPOS_BASEDIR.to_string(),
                discord: None,
            },
            report: BTreeMap::new(),
        }
    }
}

/// Merged view of the default and override documents.
///
/// The typed [`Settings`] are what the rest of the server consumes; the
/// merged document is kept alongside so keys outside the schema survive and
/// the settings API can hand back the complete structure. Serializes as the
/// merged document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    settings: Settings,
    document: Value,
}

impl ResolvedConfig {
    /// Validate `document` against [`Settings`].
    pub fn from_document(document: Value) -> Result<Self, serde_yaml::Error> {
        let settings = serde_yaml::from_value(document.clone())?;
        Ok(Self { settings, document })
    }

    /// Typed view.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings for the web process.
    pub fn dashboard(&self) -> &DashboardConfig {
        &self.settings.dashboard
    }

    /// Settings shared with the reporter.
    pub fn reporter(&self) -> &ReporterConfig {
        &self.settings.reporter
    }

    /// Monitored repositories by name.
    pub fn report(&self) -> &BTreeMap<String, RepoConfig> {
        &self.settings.report
    }

    /// Merged document including keys outside the schema.
    pub fn document(&self) -> &Value {
        &self.document
    }
}

impl Serialize for ResolvedConfig {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_ttl_treats_zero_as_unset() {
        let mut dashboard = Settings::builtin().dashboard;
        dashboard.sshfs_mount_uptime_ms = Some(0);
        assert_eq!(dashboard.mount_ttl(), DEFAULT_MOUNT_TTL);

        dashboard.sshfs_mount_uptime_ms = None;
        assert_eq!(dashboard.mount_ttl(), DEFAULT_MOUNT_TTL);

        dashboard.sshfs_mount_uptime_ms = Some(1_500);
        assert_eq!(dashboard.mount_ttl(), Duration::from_millis(1_500));
    }

    #[test]
    fn schema_fills_optional_dashboard_fields() {
        let document: Value = serde_yaml::from_str(
            r#"
dashboard:
  reporter_path: /opt/reporter
reporter:
  report_path: /r.json
  borg_path: /usr/bin/borg
  crontab_path: /c
  dedupe_path: /d
  logs_basedir: /logs
  repos_basedir: /repos
extra_section:
  kept: true
"#,
        )
        .expect("valid yaml");

        let resolved =
            ResolvedConfig::from_document(document).expect("valid schema");
        assert_eq!(resolved.dashboard().rescan_timeout_ms, 300_000);
        assert!(resolved.dashboard().reporter_args.is_empty());
        assert!(resolved.report().is_empty());
        assert!(resolved.document().get("extra_section").is_some());
    }

    #[test]
    fn schema_rejects_missing_reporter_section() {
        let document: Value =
            serde_yaml::from_str("dashboard:\n  reporter_path: /x\n")
                .expect("valid yaml");
        assert!(ResolvedConfig::from_document(document).is_err());
    }
}
