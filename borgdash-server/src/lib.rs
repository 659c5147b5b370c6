//! # borgdash server
//!
//! HTTP backend for the borg backup dashboard. It exposes:
//!
//! - **Rescan control**: start, stop and poll the external reporter process
//! - **Settings**: the merged configuration and the raw override document,
//!   with saving of edited override text
//! - **Reports**: the cached JSON report written by the reporter
//! - **Logs**: whole-file reads of repository logs, mounting `sshfs://`
//!   locations on demand
//!
//! Every handler works against a single [`AppState`] built at startup.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
