//! HTTP request handlers organized by functionality

pub mod health;
pub mod logs;
pub mod report;
pub mod rescan;
pub mod settings;

use serde::Deserialize;

/// `?force=true` bypasses a cache.
#[derive(Debug, Default, Deserialize)]
pub struct ForceQuery {
    #[serde(default)]
    pub force: bool,
}
