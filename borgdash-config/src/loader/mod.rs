/// Resolver error type.
pub mod error;
/// Document deep merge.
pub mod merge;

use std::{io::ErrorKind, path::Path, sync::Arc};

use parking_lot::RwLock;
use serde_yaml::Value;
use tracing::{debug, error, info, warn};

use crate::{models::ResolvedConfig, sources::ConfigSources};
use error::ConfigError;
use merge::deep_merge;

/// Merged view and verbatim override text, always replaced as a pair.
#[derive(Debug, Clone)]
struct CachedConfig {
    resolved: Arc<ResolvedConfig>,
    override_text: Arc<str>,
}

/// Cached resolver for the default + override configuration layers.
///
/// Reads never hold the cache lock across I/O. Two loads racing each other
/// both succeed and the one completing last is what later readers observe.
#[derive(Debug)]
pub struct ConfigResolver {
    sources: ConfigSources,
    cache: RwLock<Option<CachedConfig>>,
}

enum LayerRead {
    Parsed { document: Value, text: String },
    Missing,
    Unparseable { text: Option<String>, reason: String },
}

impl ConfigResolver {
    /// Resolver with an empty cache.
    pub fn new(sources: ConfigSources) -> Self {
        Self {
            sources,
            cache: RwLock::new(None),
        }
    }

    /// Locations this resolver reads.
    pub fn sources(&self) -> &ConfigSources {
        &self.sources
    }

    /// Merged configuration; `force` bypasses the cache.
    pub async fn get_config(
        &self,
        force: bool,
    ) -> Result<Arc<ResolvedConfig>, ConfigError> {
        Ok(self.load(force).await?.resolved)
    }

    /// Verbatim override text (empty when no override exists); `force`
    /// bypasses the cache.
    pub async fn get_text_config(
        &self,
        force: bool,
    ) -> Result<Arc<str>, ConfigError> {
        Ok(self.load(force).await?.override_text)
    }

    /// Write `text` verbatim to the override location.
    ///
    /// The cache is left untouched: callers observe the new content only
    /// after a forced reload.
    pub async fn save_config(&self, text: &str) -> Result<(), ConfigError> {
        let path = self.sources.override_path();
        match tokio::fs::write(path, text).await {
            Ok(()) => {
                info!(path = %path.display(), "configuration saved");
                Ok(())
            }
            Err(source) => {
                error!(
                    path = %path.display(),
                    error = %source,
                    "failed to save configuration"
                );
                Err(ConfigError::Write {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Drop both cached artifacts.
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }

    async fn load(&self, force: bool) -> Result<CachedConfig, ConfigError> {
        if !force {
            if let Some(cached) = self.cache.read().clone() {
                return Ok(cached);
            }
        }

        let loaded = self.load_from_sources().await?;
        *self.cache.write() = Some(loaded.clone());
        Ok(loaded)
    }

    async fn load_from_sources(&self) -> Result<CachedConfig, ConfigError> {
        let default_layer = self.load_default_layer().await;

        let override_path = self.sources.override_path();
        let (override_layer, override_text) =
            match read_layer(override_path).await {
                LayerRead::Parsed { document, text } => {
                    info!(
                        path = %override_path.display(),
                        "loaded override configuration"
                    );
                    (Some(document), text)
                }
                LayerRead::Missing => {
                    debug!(
                        path = %override_path.display(),
                        "no override configuration present"
                    );
                    (None, String::new())
                }
                LayerRead::Unparseable { text, reason } => {
                    warn!(
                        path = %override_path.display(),
                        reason = %reason,
                        "ignoring unparseable override configuration"
                    );
                    (None, text.unwrap_or_default())
                }
            };

        let resolved = match (default_layer, override_layer) {
            (Some(base), overlay) => merge_and_validate(base, overlay)?,
            (None, Some(overlay)) => {
                warn!("no default configuration; using override alone");
                ResolvedConfig::from_document(overlay)
                    .map_err(|source| ConfigError::Invalid { source })?
            }
            (None, None) => {
                error!("no configuration source could be loaded");
                return Err(ConfigError::Unavailable {
                    default: self.sources.describe_defaults(),
                    override_path: override_path.to_path_buf(),
                });
            }
        };

        Ok(CachedConfig {
            resolved: Arc::new(resolved),
            override_text: Arc::from(override_text),
        })
    }

    /// Default document from disk, or the built-in one when the file is
    /// missing, unparseable or does not satisfy the schema.
    async fn load_default_layer(&self) -> Option<Value> {
        if let Some(path) = self.sources.locate_default().await {
            match read_layer(&path).await {
                LayerRead::Parsed { document, .. } => {
                    match ResolvedConfig::from_document(document.clone()) {
                        Ok(_) => {
                            info!(
                                path = %path.display(),
                                "loaded default configuration"
                            );
                            return Some(document);
                        }
                        // Without a built-in the override may still
                        // complete it.
                        Err(_) if self.sources.builtin().is_none() => {
                            return Some(document);
                        }
                        Err(err) => warn!(
                            path = %path.display(),
                            error = %err,
                            "default configuration incomplete"
                        ),
                    }
                }
                LayerRead::Missing => {}
                LayerRead::Unparseable { reason, .. } => {
                    warn!(
                        path = %path.display(),
                        reason = %reason,
                        "default configuration unparseable"
                    );
                }
            }
        }

        self.builtin_layer()
    }

    fn builtin_layer(&self) -> Option<Value> {
        let builtin = self.sources.builtin()?;
        match serde_yaml::to_value(builtin) {
            Ok(document) => {
                info!("loading built-in default configuration");
                if let Ok(rendered) = serde_yaml::to_string(&document) {
                    debug!(%rendered, "built-in configuration");
                }
                Some(document)
            }
            Err(err) => {
                error!(error = %err, "failed to render built-in configuration");
                None
            }
        }
    }
}

fn merge_and_validate(
    base: Value,
    overlay: Option<Value>,
) -> Result<ResolvedConfig, ConfigError> {
    if let Some(overlay) = overlay {
        let mut merged = base.clone();
        deep_merge(&mut merged, overlay);
        match ResolvedConfig::from_document(merged) {
            Ok(resolved) => return Ok(resolved),
            Err(err) => warn!(
                error = %err,
                "merged configuration invalid; discarding override"
            ),
        }
    }

    ResolvedConfig::from_document(base)
        .map_err(|source| ConfigError::Invalid { source })
}

async fn read_layer(path: &Path) -> LayerRead {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return LayerRead::Missing;
        }
        Err(err) => {
            return LayerRead::Unparseable {
                text: None,
                reason: err.to_string(),
            };
        }
    };

    match serde_yaml::from_str::<Value>(&text) {
        Ok(document @ Value::Mapping(_)) => {
            LayerRead::Parsed { document, text }
        }
        Ok(Value::Null) => LayerRead::Unparseable {
            text: Some(text),
            reason: "document is empty".to_string(),
        },
        Ok(_) => LayerRead::Unparseable {
            text: Some(text),
            reason: "top level is not a mapping".to_string(),
        },
        Err(err) => LayerRead::Unparseable {
            text: Some(text),
            reason: err.to_string(),
        },
    }
}

impl From<ConfigSources> for ConfigResolver {
    fn from(sources: ConfigSources) -> Self {
        Self::new(sources)
    }
}

