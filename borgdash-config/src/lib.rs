//! Layered configuration for borgdash.
//!
//! The dashboard ships an immutable default document and lets operators edit a
//! partial override document on top of it. This crate locates both sources,
//! deep-merges the override onto the default, validates the result against the
//! typed [`Settings`] schema and caches the merged view together with the
//! verbatim override text so a settings editor can round-trip exactly what a
//! human wrote.

/// Built-in defaults and well-known locations.
pub mod constants;
/// Cached resolution of the configuration layers.
pub mod loader;
/// Typed configuration schema.
pub mod models;
/// Locations of the configuration layers.
pub mod sources;

pub use loader::{ConfigResolver, error::ConfigError, merge::deep_merge};
pub use models::{
    DashboardConfig, DiscordConfig, RepoConfig, ReporterConfig,
    ResolvedConfig, Settings,
};
pub use sources::ConfigSources;
