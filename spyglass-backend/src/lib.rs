pub mod config;
mod error;
mod routes;

use axum::{Router, http::StatusCode, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

pub struct AppState {
    pub db: spyglass_db::Database,
}

/// Create the application router with the given database and configuration
pub fn create_app(
    db: spyglass_db::Database,
    request_body_limit: usize,
    request_timeout: Duration,
) -> Router {
    let state = Arc::new(AppState { db });

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/servers", get(routes::list_servers))
        .route("/servers/{address}", get(routes::get_server))
        .route("/records", get(routes::list_records))
        .route("/players", get(routes::list_players))
        .route("/players/{uuid}", get(routes::get_player))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .with_state(state)
}
