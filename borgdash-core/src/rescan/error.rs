use borgdash_config::ConfigError;
use thiserror::Error;

/// Failures surfaced by [`RescanSupervisor`](super::RescanSupervisor).
///
/// Launch failures and timeouts are not errors here: they end the run with
/// an `Error` status and the reason in its stderr buffer.
#[derive(Debug, Error)]
pub enum RescanError {
    /// Reporter location could not be read.
    #[error("rescan configuration unavailable")]
    Config(#[from] ConfigError),
}
