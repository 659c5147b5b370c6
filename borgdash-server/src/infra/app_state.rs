use std::{fmt, sync::Arc};

use borgdash_config::ConfigResolver;
use borgdash_core::{LogFsBridge, RescanSupervisor};

use crate::infra::report::ReportStore;

/// Long-lived services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigResolver>,
    rescan: RescanSupervisor,
    logfs: LogFsBridge,
    reports: Arc<ReportStore>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("rescan", &self.rescan)
            .field("logfs", &self.logfs)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Production wiring: `sshfs` backed log mounts.
    pub fn new(config: Arc<ConfigResolver>) -> Self {
        let logfs = LogFsBridge::new(Arc::clone(&config));
        Self::with_logfs(config, logfs)
    }

    pub fn with_logfs(config: Arc<ConfigResolver>, logfs: LogFsBridge) -> Self {
        Self {
            rescan: RescanSupervisor::new(Arc::clone(&config)),
            reports: Arc::new(ReportStore::new(Arc::clone(&config))),
            logfs,
            config,
        }
    }

    pub fn config(&self) -> &ConfigResolver {
        &self.config
    }

    pub fn rescan(&self) -> &RescanSupervisor {
        &self.rescan
    }

    pub fn logfs(&self) -> &LogFsBridge {
        &self.logfs
    }

    pub fn reports(&self) -> &ReportStore {
        &self.reports
    }
}
