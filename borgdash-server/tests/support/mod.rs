#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use axum_test::TestServer;
use borgdash_config::{ConfigResolver, ConfigSources};
use borgdash_core::{CommandOutput, LogFsBridge, LogFsError, MountDriver};
use borgdash_server::{AppState, routes::create_app};
use tempfile::TempDir;

/// Log file every fake remote mount contains.
pub const REMOTE_LOG: &str = "2024-05-01.log";
pub const REMOTE_LOG_CONTENT: &str = "borg create: archive home-2024-05-01\n";

/// Populates the mount point with [`REMOTE_LOG`] instead of running sshfs.
#[derive(Debug, Default)]
pub struct FakeSshfs;

#[async_trait]
impl MountDriver for FakeSshfs {
    async fn mount(
        &self,
        _remote: &str,
        mount_point: &Path,
    ) -> Result<CommandOutput, LogFsError> {
        tokio::fs::write(mount_point.join(REMOTE_LOG), REMOTE_LOG_CONTENT)
            .await
            .map_err(|source| LogFsError::MountPoint { source })?;
        Ok(CommandOutput::ok())
    }

    async fn unmount(
        &self,
        _mount_point: &Path,
    ) -> Result<CommandOutput, LogFsError> {
        Ok(CommandOutput::ok())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn override_path(&self) -> PathBuf {
        self.state.config().sources().override_path().to_path_buf()
    }
}

pub fn default_document(dir: &Path, reporter_script: &str) -> String {
    let dir = dir.display();
    format!(
        r#"# shipped defaults
dashboard:
  reporter_path: sh
  reporter_args: ["-c", "{reporter_script}"]
  rescan_timeout_ms: 10000
reporter:
  report_path: {dir}/report.json
  borg_path: /usr/bin/borg
  crontab_path: {dir}/crontab
  dedupe_path: {dir}/dedupe.json
  logs_basedir: {dir}/logs
  repos_basedir: {dir}/repos
report:
  home:
    repo_path: /srv/borg/home
"#
    )
}

pub fn build_test_app(reporter_script: &str) -> TestApp {
    let dir = TempDir::new().expect("tempdir");
    let default_path = dir.path().join("config_default.yaml");
    std::fs::write(&default_path, default_document(dir.path(), reporter_script))
        .expect("write defaults");
    build_test_app_with(dir, default_path, None)
}

/// App whose override document lives at `override_path` (defaults to a file
/// inside the tempdir).
pub fn build_test_app_with(
    dir: TempDir,
    default_path: PathBuf,
    override_path: Option<PathBuf>,
) -> TestApp {
    let override_path =
        override_path.unwrap_or_else(|| dir.path().join("config.yaml"));
    let sources = ConfigSources::new(override_path, default_path);
    let config = Arc::new(ConfigResolver::new(sources));

    let mount_root = dir.path().join("mounts");
    std::fs::create_dir_all(&mount_root).expect("mount root");
    let logfs = LogFsBridge::with_mount_root(
        Arc::clone(&config),
        Arc::new(FakeSshfs),
        mount_root,
    );

    let state = AppState::with_logfs(config, logfs);
    let server = TestServer::new(create_app(state.clone()))
        .expect("test server");
    TestApp { server, state, dir }
}
