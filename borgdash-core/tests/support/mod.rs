#![allow(dead_code)]

use std::{path::Path, sync::Arc, time::Duration};

use borgdash_config::{ConfigResolver, ConfigSources, Settings};

/// Resolver whose only layer is `settings`; neither file exists on disk.
pub fn resolver_with(dir: &Path, settings: Settings) -> Arc<ConfigResolver> {
    let sources = ConfigSources::new(
        dir.join("config.yaml"),
        dir.join("config_default.yaml"),
    )
    .with_builtin(settings);
    Arc::new(ConfigResolver::new(sources))
}

/// Settings launching `sh -c <script>` as the reporter.
pub fn shell_reporter(script: &str, timeout: Duration) -> Settings {
    let mut settings = Settings::builtin();
    settings.dashboard.reporter_path = "sh".to_string();
    settings.dashboard.reporter_args =
        vec!["-c".to_string(), script.to_string()];
    settings.dashboard.rescan_timeout_ms = timeout.as_millis() as u64;
    settings
}

pub fn with_mount_ttl(ttl: Duration) -> Settings {
    let mut settings = Settings::builtin();
    settings.dashboard.sshfs_mount_uptime_ms = Some(ttl.as_millis() as u64);
    settings
}

/// Poll `check` until it holds or `within` elapses.
pub async fn eventually<F>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
