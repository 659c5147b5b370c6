use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use borgdash_config::ResolvedConfig;
use serde::{Deserialize, Serialize};

use super::ForceQuery;
use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Serialize)]
pub struct ConfigDataResponse {
    pub configdata: Arc<ResolvedConfig>,
}

#[derive(Debug, Serialize)]
pub struct ConfigTextResponse {
    pub configtext: Arc<str>,
}

/// Edited override document, stored verbatim.
#[derive(Debug, Deserialize)]
pub struct SaveConfigRequest {
    pub configdata: String,
}

pub async fn get_config_handler(
    State(state): State<AppState>,
    Query(query): Query<ForceQuery>,
) -> AppResult<Json<ConfigDataResponse>> {
    let configdata = state.config().get_config(query.force).await?;
    Ok(Json(ConfigDataResponse { configdata }))
}

pub async fn get_config_text_handler(
    State(state): State<AppState>,
    Query(query): Query<ForceQuery>,
) -> AppResult<Json<ConfigTextResponse>> {
    let configtext = state.config().get_text_config(query.force).await?;
    Ok(Json(ConfigTextResponse { configtext }))
}

/// The cached configuration is not refreshed; clients reload with
/// `?force=true` to observe the saved text.
pub async fn save_config_handler(
    State(state): State<AppState>,
    Json(request): Json<SaveConfigRequest>,
) -> AppResult<StatusCode> {
    state.config().save_config(&request.configdata).await?;
    Ok(StatusCode::NO_CONTENT)
}
