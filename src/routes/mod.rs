// src/routes/mod.rs
pub mod board;
pub mod presence;

use axum::{routing::get, Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub fn create_router() -> Router {
    Router::new()
        .route("/ws", get(presence::websocket_handler))
        .route("/players", get(board::players))
        .route("/board.svg", get(board::board_svg))
        .route("/health", get(board::health))
}

/// Full application: the API under `/api` with shared state and CORS.
pub fn app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", create_router())
        .layer(Extension(app_state))
        .layer(CorsLayer::permissive())
}
