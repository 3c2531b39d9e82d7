use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handler::{self, AppState};

/// Build the axum router with all Microtext endpoints.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/pages", get(handler::pages_handler))
        .route("/v1/content", get(handler::content_handler))
        .route("/v1/content/field", post(handler::field_handler))
        .route("/v1/content/array", post(handler::array_handler))
        .route("/v1/publish", post(handler::publish_handler))
        .route("/v1/publish/status", get(handler::publish_status_handler))
        .route("/v1/tools", get(handler::tools_handler))
        .route("/v1/tools/:name", post(handler::tool_call_handler))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
