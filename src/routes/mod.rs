pub mod detect;
pub mod health;
pub mod sessions;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::middleware::{rate_limit, request_id};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_body = state.config().limits.max_body_bytes;

    let api_routes = Router::new()
        .route("/detect", post(detect::detect))
        .nest("/sessions", sessions::router());

    // `/detect` at the root is what the browser capture page posts to.
    let limited_routes = Router::new()
        .route("/detect", post(detect::detect))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ))
        .layer(DefaultBodyLimit::max(max_body));

    let static_dir = state.config().static_dir.clone();
    let spa_fallback = ServeDir::new(&static_dir)
        .not_found_service(ServeFile::new(format!("{static_dir}/index.html")));

    Router::new()
        .merge(limited_routes)
        .nest("/health", health::router())
        .fallback_service(spa_fallback)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .with_state(state)
}
