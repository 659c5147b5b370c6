use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::Json,
};
use borgdash_core::{ScanStatus, StartOutcome};
use serde::Deserialize;
use tracing::info;

use crate::infra::{app_state::AppState, errors::AppResult};

const DEFAULT_WAIT: Duration = Duration::from_secs(30);
const MAX_WAIT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
pub struct WaitQuery {
    pub timeout_ms: Option<u64>,
}

pub async fn rescan_status_handler(
    State(state): State<AppState>,
) -> Json<ScanStatus> {
    Json(state.rescan().get_status())
}

/// Start a rescan unless one is running; replies with the status either way.
pub async fn start_rescan_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ScanStatus>> {
    match state.rescan().start().await? {
        StartOutcome::Started => info!("rescan requested"),
        StartOutcome::AlreadyRunning => {
            info!("rescan requested while one is running")
        }
    }
    Ok(Json(state.rescan().get_status()))
}

pub async fn stop_rescan_handler(
    State(state): State<AppState>,
) -> Json<ScanStatus> {
    state.rescan().stop();
    Json(state.rescan().get_status())
}

/// Long-poll variant of the status endpoint.
pub async fn wait_rescan_handler(
    State(state): State<AppState>,
    Query(query): Query<WaitQuery>,
) -> Json<ScanStatus> {
    let timeout = query
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_WAIT)
        .min(MAX_WAIT);
    Json(state.rescan().wait_for_terminal(timeout).await)
}
