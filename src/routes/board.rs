use axum::{
    extract::Query,
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::models::player::SessionId;
use crate::services::render::render_board;
use crate::services::store::Players;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    pub me: Option<SessionId>,
}

pub async fn players(Extension(app_state): Extension<Arc<AppState>>) -> Json<Players> {
    let snapshot = app_state.store.snapshot().await;
    Json(snapshot.as_ref().clone())
}

pub async fn board_svg(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query): Query<BoardQuery>,
) -> impl IntoResponse {
    let snapshot = app_state.store.snapshot().await;
    let svg = render_board(&snapshot, query.me, &app_state.grid.bounds);
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg)
}

pub async fn health() -> &'static str {
    "ok"
}
