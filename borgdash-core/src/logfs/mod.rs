mod driver;
mod error;

pub use driver::{CommandOutput, MountDriver, SshfsDriver};
pub use error::LogFsError;

use std::{
    collections::HashMap,
    fmt,
    path::{Component, Path, PathBuf},
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use borgdash_config::ConfigResolver;
use parking_lot::Mutex;
use tokio::{sync::OnceCell, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// Scheme marking a log location that must be mounted before reading.
pub const SSHFS_PREFIX: &str = "sshfs://";
const MOUNT_DIR_PREFIX: &str = "sshfsmount-";

/// True when `target` names a location that needs a mount.
pub fn is_remote_target(target: &str) -> bool {
    target.starts_with(SSHFS_PREFIX)
}

fn remote_address(target: &str) -> &str {
    target.strip_prefix(SSHFS_PREFIX).unwrap_or(target)
}

/// Registry cell for one remote target. The cell stays empty until a mount
/// succeeds; concurrent resolvers of the same target await the same attempt.
#[derive(Debug, Default)]
struct MountSlot {
    mount: OnceCell<Mount>,
    expiry: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, Clone)]
struct Mount {
    mount_point: PathBuf,
    ttl: Duration,
}

/// Maps remote log locations to local mount points.
///
/// Mounts are created lazily on first resolution and released a fixed time
/// after they were made; reuse does not extend that lifetime.
#[derive(Clone)]
pub struct LogFsBridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: Arc<ConfigResolver>,
    driver: Arc<dyn MountDriver>,
    mount_root: PathBuf,
    registry: Mutex<HashMap<String, Arc<MountSlot>>>,
}

impl fmt::Debug for LogFsBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogFsBridge")
            .field("driver", &self.inner.driver)
            .field("mount_root", &self.inner.mount_root)
            .field("mounted", &self.mounted_targets())
            .finish()
    }
}

impl LogFsBridge {
    /// Bridge backed by `sshfs`, mounting under the system temp directory.
    pub fn new(config: Arc<ConfigResolver>) -> Self {
        Self::with_driver(config, Arc::new(SshfsDriver::default()))
    }

    /// Bridge using `driver`, mounting under the system temp directory.
    pub fn with_driver(
        config: Arc<ConfigResolver>,
        driver: Arc<dyn MountDriver>,
    ) -> Self {
        Self::with_mount_root(config, driver, std::env::temp_dir())
    }

    /// Bridge using `driver`, mounting under `mount_root`.
    pub fn with_mount_root(
        config: Arc<ConfigResolver>,
        driver: Arc<dyn MountDriver>,
        mount_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                config,
                driver,
                mount_root: mount_root.into(),
                registry: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Local path for `log_name`.
    ///
    /// Non-remote targets return `local_fallback` untouched without touching
    /// the registry. Remote targets are mounted if needed and `log_name` is
    /// joined onto the mount point.
    pub async fn resolve_local_path(
        &self,
        log_name: &str,
        local_fallback: &Path,
        remote_target: &str,
    ) -> Result<PathBuf, LogFsError> {
        if !is_remote_target(remote_target) {
            return Ok(local_fallback.to_path_buf());
        }

        validate_log_name(log_name)?;
        let mount_point = self.ensure_mounted(remote_target).await?;
        Ok(mount_point.join(log_name))
    }

    /// Mount point for `target`, mounting it first when absent.
    pub async fn ensure_mounted(
        &self,
        target: &str,
    ) -> Result<PathBuf, LogFsError> {
        let slot = self.inner.slot(target);
        let fresh = AtomicBool::new(false);
        let mounted = slot
            .mount
            .get_or_try_init(|| async {
                let mount = self.inner.mount(target).await?;
                fresh.store(true, Ordering::Release);
                Ok::<_, LogFsError>(mount)
            })
            .await;

        match mounted {
            Ok(mount) => {
                if fresh.load(Ordering::Acquire) {
                    self.inner.schedule_expiry(target, &slot, mount.ttl);
                }
                Ok(mount.mount_point.clone())
            }
            Err(err) => {
                self.inner.discard_empty_slot(target, &slot);
                Err(err)
            }
        }
    }

    /// Release `target` now. Unknown targets are a no-op; returns whether a
    /// mount was released.
    pub async fn unmount(&self, target: &str) -> bool {
        self.inner.teardown(target, None).await
    }

    /// Cancel every pending expiry and release all mounts.
    pub async fn shutdown(&self) {
        let targets = self.mounted_targets();
        if !targets.is_empty() {
            info!(count = targets.len(), "releasing remote log mounts");
        }
        for target in targets {
            self.inner.teardown(&target, None).await;
        }
    }

    /// Targets with an established mount.
    pub fn mounted_targets(&self) -> Vec<String> {
        let registry = self.inner.registry.lock();
        let mut targets: Vec<String> = registry
            .iter()
            .filter(|(_, slot)| slot.mount.initialized())
            .map(|(target, _)| target.clone())
            .collect();
        targets.sort();
        targets
    }
}

impl BridgeInner {
    fn slot(&self, target: &str) -> Arc<MountSlot> {
        let mut registry = self.registry.lock();
        Arc::clone(registry.entry(target.to_string()).or_default())
    }

    /// Drop a slot whose mount attempt failed, unless another caller has
    /// since replaced or filled it.
    fn discard_empty_slot(&self, target: &str, slot: &Arc<MountSlot>) {
        let mut registry = self.registry.lock();
        if let Some(current) = registry.get(target) {
            if Arc::ptr_eq(current, slot) && !current.mount.initialized() {
                registry.remove(target);
            }
        }
    }

    async fn mount(&self, remote_target: &str) -> Result<Mount, LogFsError> {
        let ttl = self.config.get_config(false).await?.dashboard().mount_ttl();

        let tempdir = tempfile::Builder::new()
            .prefix(MOUNT_DIR_PREFIX)
            .tempdir_in(&self.mount_root)
            .map_err(|source| LogFsError::MountPoint { source })?;
        let mount_point = tokio::fs::canonicalize(tempdir.path())
            .await
            .map_err(|source| LogFsError::MountPoint { source })?;

        let output = self
            .driver
            .mount(remote_address(remote_target), &mount_point)
            .await?;
        log_command_output("mount", &output);

        if !output.success {
            error!(
                remote_target,
                mount_point = %mount_point.display(),
                status = %output.status_label(),
                "remote log mount failed"
            );
            return Err(LogFsError::MountFailed {
                target: remote_target.to_string(),
                mount_point,
                status: output.status_label(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        // From here the directory is a live mount; it must only be removed
        // after a successful unmount.
        let _ = tempdir.keep();
        info!(
            remote_target,
            mount_point = %mount_point.display(),
            ttl = %humantime::format_duration(ttl),
            "mounted remote logs"
        );

        Ok(Mount { mount_point, ttl })
    }

    fn schedule_expiry(
        self: &Arc<Self>,
        remote_target: &str,
        slot: &Arc<MountSlot>,
        ttl: Duration,
    ) {
        let bridge: Weak<Self> = Arc::downgrade(self);
        let remote_target = remote_target.to_string();
        let owner = Arc::clone(slot);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(bridge) = bridge.upgrade() {
                debug!(%remote_target, "remote log mount expired");
                bridge.teardown(&remote_target, Some(&owner)).await;
            }
        });
        *slot.expiry.lock() = Some(handle);
    }

    /// Remove `remote_target` from the registry, unmount it and delete its
    /// mount point.
    ///
    /// `expiring` is set by the expiry task: only that exact slot is torn
    /// down, and the task does not abort itself.
    async fn teardown(
        &self,
        remote_target: &str,
        expiring: Option<&Arc<MountSlot>>,
    ) -> bool {
        let slot = {
            let mut registry = self.registry.lock();
            let owned = registry.get(remote_target).is_some_and(|slot| {
                slot.mount.initialized()
                    && expiring.is_none_or(|owner| Arc::ptr_eq(owner, slot))
            });
            if owned {
                registry.remove(remote_target)
            } else {
                None
            }
        };
        let Some(slot) = slot else {
            return false;
        };
        let Some(mount_point) =
            slot.mount.get().map(|mount| mount.mount_point.clone())
        else {
            return false;
        };

        let expiry = slot.expiry.lock().take();
        if expiring.is_none() {
            if let Some(handle) = expiry {
                handle.abort();
            }
        }

        let unmounted = match self.driver.unmount(&mount_point).await {
            Ok(output) => {
                log_command_output("unmount", &output);
                if !output.success {
                    warn!(
                        remote_target,
                        mount_point = %mount_point.display(),
                        status = %output.status_label(),
                        "unmount failed; leaving mount point in place"
                    );
                }
                output.success
            }
            Err(err) => {
                warn!(remote_target, error = %err, "unmount command failed");
                false
            }
        };

        if unmounted {
            if let Err(err) = tokio::fs::remove_dir_all(&mount_point).await {
                warn!(
                    mount_point = %mount_point.display(),
                    error = %err,
                    "failed to remove mount point"
                );
            }
        }

        info!(
            remote_target,
            mount_point = %mount_point.display(),
            "unmounted remote logs"
        );
        true
    }
}

fn log_command_output(action: &str, output: &CommandOutput) {
    let stdout = output.stdout.trim();
    let stderr = output.stderr.trim();
    if !stdout.is_empty() {
        info!(action, stdout, "mount command output");
    }
    if !stderr.is_empty() {
        warn!(action, stderr, "mount command stderr");
    }
}

fn validate_log_name(name: &str) -> Result<(), LogFsError> {
    let path = Path::new(name);
    let plain = !name.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(LogFsError::InvalidLogName {
            name: name.to_string(),
        })
    }
}
