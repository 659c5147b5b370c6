use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handlers::{
        health::health_handler,
        logs::read_log_handler,
        report::reload_report_handler,
        rescan::{
            rescan_status_handler, start_rescan_handler, stop_rescan_handler,
            wait_rescan_handler,
        },
        settings::{
            get_config_handler, get_config_text_handler, save_config_handler,
        },
    },
};

/// Request paths served by [`create_app`].
pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const RESCAN: &str = "/api/rescan";
    pub const RESCAN_WAIT: &str = "/api/rescan/wait";
    pub const CONFIG: &str = "/api/config";
    pub const CONFIG_TEXT: &str = "/api/config/text";
    pub const READ_LOG: &str = "/api/readlog";
    pub const RELOAD: &str = "/api/reload";
}

/// Dashboard API routes.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route(
            paths::RESCAN,
            get(rescan_status_handler)
                .put(start_rescan_handler)
                .delete(stop_rescan_handler),
        )
        .route(paths::RESCAN_WAIT, get(wait_rescan_handler))
        .route(
            paths::CONFIG,
            get(get_config_handler).put(save_config_handler),
        )
        .route(paths::CONFIG_TEXT, get(get_config_text_handler))
        .route(paths::READ_LOG, post(read_log_handler))
        .route(paths::RELOAD, get(reload_report_handler))
}

/// Complete application: API routes, liveness check and request tracing.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(paths::HEALTH, get(health_handler))
        .merge(create_api_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
