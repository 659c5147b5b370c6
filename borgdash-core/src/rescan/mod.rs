mod error;
mod run;
mod status;

pub use error::RescanError;
pub use status::{ScanState, ScanStatus};

use std::{fmt, sync::Arc, time::Duration};

use borgdash_config::ConfigResolver;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use run::{EXIT_SETTLE, RescanRun};

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new reporter process was spawned.
    Started,
    /// A run was already in flight; nothing was launched.
    AlreadyRunning,
}

/// Owner of the single rescan process slot.
///
/// Cheap to clone; every clone drives the same slot. Status reads take a
/// short synchronous lock and never wait on the process.
#[derive(Clone)]
pub struct RescanSupervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    config: Arc<ConfigResolver>,
    current: RwLock<Option<Arc<RescanRun>>>,
    /// Serializes the "not running -> running" transition.
    launch: Mutex<()>,
}

impl fmt::Debug for RescanSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.current().map(|run| run.state());
        f.debug_struct("RescanSupervisor")
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

impl RescanSupervisor {
    /// Supervisor with no run yet.
    pub fn new(config: Arc<ConfigResolver>) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                config,
                current: RwLock::new(None),
                launch: Mutex::new(()),
            }),
        }
    }

    /// True while a launched process has neither exited nor been stopped.
    pub fn is_running(&self) -> bool {
        self.current().is_some_and(|run| run.is_running())
    }

    /// Launch the configured reporter unless one is already running.
    ///
    /// Concurrent callers are serialized: exactly one of them launches. A
    /// run that was stopped but has not exited yet is waited for first, so
    /// two reporter processes never overlap.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<StartOutcome, RescanError> {
        let _launch = self.inner.launch.lock().await;

        if self.is_running() {
            info!("rescan already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        if let Some(previous) = self.current().filter(|run| !run.is_finished())
        {
            info!("waiting for stopped rescan to exit");
            let settled =
                tokio::time::timeout(EXIT_SETTLE, previous.wait_finished())
                    .await
                    .is_ok();
            if !settled {
                warn!("stopped rescan still alive; not launching another");
                return Ok(StartOutcome::AlreadyRunning);
            }
        }

        let config = self.inner.config.get_config(false).await?;
        let dashboard = config.dashboard();
        let run = RescanRun::launch(
            &dashboard.reporter_path,
            &dashboard.reporter_args,
            dashboard.rescan_timeout(),
        );

        *self.inner.current.write() = Some(run);
        Ok(StartOutcome::Started)
    }

    /// Signal the running process to terminate. Does not wait for exit.
    ///
    /// Returns whether a signal was sent; calling this with nothing running
    /// changes nothing.
    pub fn stop(&self) -> bool {
        match self.current() {
            Some(run) if run.request_stop() => true,
            _ => {
                info!("no rescan running; stop ignored");
                false
            }
        }
    }

    /// Status of the latest run, or idle before the first one.
    pub fn get_status(&self) -> ScanStatus {
        self.current()
            .map(|run| run.snapshot())
            .unwrap_or_else(ScanStatus::idle)
    }

    /// Wait until the current run has fully finished or `timeout` elapses,
    /// then report the status at that moment.
    pub async fn wait_for_terminal(&self, timeout: Duration) -> ScanStatus {
        let Some(run) = self.current() else {
            return ScanStatus::idle();
        };

        let _ = tokio::time::timeout(timeout, run.wait_finished()).await;
        run.snapshot()
    }

    fn current(&self) -> Option<Arc<RescanRun>> {
        self.inner.current.read().clone()
    }
}
