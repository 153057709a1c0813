//! Route modules for the Image Tools server

pub mod download;
pub mod form;
pub mod health;
pub mod links;
pub mod tools;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit;
use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/download/:filename", get(download::download))
        .merge(tools::router())
        .layer(DefaultBodyLimit::max(state.config().limits.max_upload_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
