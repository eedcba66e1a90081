pub mod chat;
pub mod documents;
pub mod health;
pub mod sessions;
pub mod settings;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_mw,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::admin::admin_middleware;
use crate::middleware::session::session_middleware;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let upload = &state.config.upload;
    let upload_limit = upload
        .max_file_size_bytes
        .saturating_mul(upload.max_files)
        .saturating_add(1024 * 1024);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/settings/llm", get(settings::get_llm_settings));

    let admin_routes = Router::new()
        .route("/api/settings/llm", put(settings::update_llm_settings))
        .route_layer(axum_mw::from_fn_with_state(state.clone(), admin_middleware));

    let upload_routes = Router::new()
        .route("/api/documents/analyze", post(documents::analyze))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit));

    let session_routes = Router::new()
        .merge(upload_routes)
        .route("/api/chat/ask", post(chat::ask))
        .route(
            "/api/sessions/current",
            get(sessions::get_current).delete(sessions::end_current),
        )
        .route_layer(axum_mw::from_fn(session_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(session_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
