use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Serialize;
use serde_json::Value;

use super::ForceQuery;
use crate::infra::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub reportdata: Option<Arc<Value>>,
}

pub async fn reload_report_handler(
    State(state): State<AppState>,
    Query(query): Query<ForceQuery>,
) -> Json<ReportResponse> {
    let reportdata = state.reports().load(query.force).await;
    Json(ReportResponse { reportdata })
}
