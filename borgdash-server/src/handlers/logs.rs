use std::path::PathBuf;

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Deserialize)]
pub struct ReadLogRequest {
    /// Log file name relative to the repository log location.
    pub filename: String,
    /// Path the reporter recorded; used as is for local log locations.
    pub filepath: PathBuf,
    /// Repository log location, possibly an `sshfs://` target.
    #[serde(default)]
    pub repologpath: String,
}

#[derive(Debug, Serialize)]
pub struct ReadLogResponse {
    pub filecontent: String,
}

pub async fn read_log_handler(
    State(state): State<AppState>,
    Json(request): Json<ReadLogRequest>,
) -> AppResult<Json<ReadLogResponse>> {
    let path = state
        .logfs()
        .resolve_local_path(
            &request.filename,
            &request.filepath,
            &request.repologpath,
        )
        .await?;

    let filecontent =
        tokio::fs::read_to_string(&path).await.inspect_err(|err| {
            warn!(path = %path.display(), error = %err, "failed to read log");
        })?;
    Ok(Json(ReadLogResponse { filecontent }))
}
