use std::{ffi::OsStr, fmt, path::Path, process::Output};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::error::LogFsError;

/// Captured result of an external mount or unmount command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal.
    pub code: Option<i32>,
    /// Whether the command exited with status 0.
    pub success: bool,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Successful run with no output.
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Failed run with exit `code` and `stderr`.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub(crate) fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Mechanism that attaches a remote log location to a local directory.
#[async_trait]
pub trait MountDriver: Send + Sync + fmt::Debug {
    /// Attach `remote` (scheme already stripped) at `mount_point`.
    async fn mount(
        &self,
        remote: &str,
        mount_point: &Path,
    ) -> Result<CommandOutput, LogFsError>;

    /// Detach whatever is mounted at `mount_point`.
    async fn unmount(
        &self,
        mount_point: &Path,
    ) -> Result<CommandOutput, LogFsError>;
}

/// `sshfs` / `umount` based driver.
#[derive(Debug, Clone)]
pub struct SshfsDriver {
    mount_program: String,
    mount_options: Vec<String>,
    unmount_program: String,
    unmount_options: Vec<String>,
}

impl Default for SshfsDriver {
    fn default() -> Self {
        Self {
            mount_program: "sshfs".to_string(),
            mount_options: vec!["-o".to_string(), "allow_other".to_string()],
            unmount_program: "umount".to_string(),
            unmount_options: Vec::new(),
        }
    }
}

impl SshfsDriver {
    /// Arguments are followed by the remote address and the mount point.
    pub fn with_mount_command(
        mut self,
        program: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        self.mount_program = program.into();
        self.mount_options = options;
        self
    }

    /// e.g. `fusermount -u` for unprivileged unmounts.
    pub fn with_unmount_command(
        mut self,
        program: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        self.unmount_program = program.into();
        self.unmount_options = options;
        self
    }
}

#[async_trait]
impl MountDriver for SshfsDriver {
    async fn mount(
        &self,
        remote: &str,
        mount_point: &Path,
    ) -> Result<CommandOutput, LogFsError> {
        let args = self
            .mount_options
            .iter()
            .map(OsStr::new)
            .chain([OsStr::new(remote), mount_point.as_os_str()]);
        run(&self.mount_program, args).await
    }

    /// Detach whatever is mounted at `mount_point`.
    async fn unmount(
        &self,
        mount_point: &Path,
    ) -> Result<CommandOutput, LogFsError> {
        let args = self
            .unmount_options
            .iter()
            .map(OsStr::new)
            .chain([mount_point.as_os_str()]);
        run(&self.unmount_program, args).await
    }
}

async fn run<'a>(
    program: &str,
    args: impl IntoIterator<Item = &'a OsStr>,
) -> Result<CommandOutput, LogFsError> {
    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);
    debug!(?command, "running mount command");

    let output =
        command.output().await.map_err(|source| LogFsError::Command {
            program: program.to_string(),
            source,
        })?;
    Ok(output.into())
}
