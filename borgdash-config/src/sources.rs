use std::path::{Path, PathBuf};

use crate::{
    constants::{
        BUILD_TREE_DEFAULTS_PATH, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH_ENV,
        DEFAULT_DEFAULTS_PATH, DEFAULT_OVERRIDE_PATH,
    },
    models::Settings,
};

/// Where the two configuration layers come from.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    override_path: PathBuf,
    default_candidates: Vec<PathBuf>,
    builtin: Option<Settings>,
}

impl ConfigSources {
    /// Explicit override path, a single default candidate and the built-in
    /// fallback.
    pub fn new(
        override_path: impl Into<PathBuf>,
        default_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            override_path: override_path.into(),
            default_candidates: vec![default_path.into()],
            builtin: Some(Settings::builtin()),
        }
    }

    /// Resolve locations from `BORGDASH_CONFIG` / `BORGDASH_DEFAULT_CONFIG`,
    /// falling back to the fixed system locations.
    pub fn from_env() -> Self {
        let override_path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OVERRIDE_PATH));

        let runtime_default = std::env::var(DEFAULT_CONFIG_PATH_ENV)
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEFAULTS_PATH));

        Self {
            override_path,
            default_candidates: vec![
                runtime_default,
                PathBuf::from(BUILD_TREE_DEFAULTS_PATH),
            ],
            builtin: Some(Settings::builtin()),
        }
    }

    /// Replace the override location.
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = path.into();
        self
    }

    /// Replace every default candidate with `path`.
    pub fn with_default_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_candidates = vec![path.into()];
        self
    }

    /// Replace the built-in fallback structure.
    pub fn with_builtin(mut self, builtin: Settings) -> Self {
        self.builtin = Some(builtin);
        self
    }

    /// Disable the hardcoded fallback; a missing default then counts as a
    /// missing layer.
    pub fn without_builtin(mut self) -> Self {
        self.builtin = None;
        self
    }

    /// Editable override document location.
    pub fn override_path(&self) -> &Path {
        &self.override_path
    }

    /// Default locations, in lookup order.
    pub fn default_candidates(&self) -> &[PathBuf] {
        &self.default_candidates
    }

    /// Built-in fallback, unless disabled.
    pub fn builtin(&self) -> Option<&Settings> {
        self.builtin.as_ref()
    }

    /// First default candidate present on disk.
    pub(crate) async fn locate_default(&self) -> Option<PathBuf> {
        for candidate in &self.default_candidates {
            if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
                return Some(candidate.clone());
            }
        }
        None
    }

    /// Default candidates joined for log lines.
    pub fn describe_defaults(&self) -> String {
        self.default_candidates
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn locate_default_prefers_first_existing_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let second = dir.path().join("second.yaml");
        std::fs::write(&second, "a: 1\n").expect("write");

        let mut sources = ConfigSources::new(dir.path().join("o.yaml"), "x");
        sources.default_candidates =
            vec![dir.path().join("missing.yaml"), second.clone()];

        assert_eq!(sources.locate_default().await, Some(second));
    }

    #[tokio::test]
    async fn locate_default_returns_none_when_nothing_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sources = ConfigSources::new(
            dir.path().join("o.yaml"),
            dir.path().join("d.yaml"),
        );
        assert!(sources.locate_default().await.is_none());
    }
}
