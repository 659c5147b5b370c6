use std::{fmt, path::PathBuf, sync::Arc};

use borgdash_config::{ConfigError, ConfigResolver};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report location unknown")]
    Config(#[from] ConfigError),
    #[error("failed to read report {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("report {} is not valid JSON", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Cache of the JSON report produced by the reporter executable.
///
/// A failed reload keeps the previously cached report, so the dashboard keeps
/// showing the last good data while the reporter rewrites its file.
pub struct ReportStore {
    config: Arc<ConfigResolver>,
    cache: RwLock<Option<Arc<Value>>>,
}

impl fmt::Debug for ReportStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportStore")
            .field("cached", &self.cache.read().is_some())
            .finish_non_exhaustive()
    }
}

impl ReportStore {
    pub fn new(config: Arc<ConfigResolver>) -> Self {
        Self {
            config,
            cache: RwLock::new(None),
        }
    }

    /// Current report, reading it from disk when nothing is cached or
    /// `force` is set. `None` until a report has been read successfully.
    pub async fn load(&self, force: bool) -> Option<Arc<Value>> {
        if !force {
            if let Some(cached) = self.cached() {
                return Some(cached);
            }
        }

        match self.read_report().await {
            Ok(report) => {
                let report = Arc::new(report);
                *self.cache.write() = Some(Arc::clone(&report));
                Some(report)
            }
            Err(err) => {
                warn!(
                    error = ?err,
                    "failed to load report; keeping previous data"
                );
                self.cached()
            }
        }
    }

    pub fn cached(&self) -> Option<Arc<Value>> {
        self.cache.read().clone()
    }

    async fn read_report(&self) -> Result<Value, ReportError> {
        let config = self.config.get_config(false).await?;
        let path = PathBuf::from(&config.reporter().report_path);

        let text = tokio::fs::read_to_string(&path).await.map_err(|source| {
            ReportError::Read {
                path: path.clone(),
                source,
            }
        })?;
        let report =
            serde_json::from_str(&text).map_err(|source| ReportError::Parse {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), "loaded report");
        Ok(report)
    }
}
