use crate::AppState;
use crate::error::AppError;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use axum_macros::debug_handler;
use serde::{Deserialize, Serialize};
use spyglass_db::{Player, Record, Server, ServerFilter};
use std::sync::Arc;

/// Records shown on a server's detail page.
const RECENT_RECORDS: u32 = 25;

fn default_page() -> u32 {
    1
}

fn validate_page(page: u32) -> Result<(), AppError> {
    if page < 1 {
        return Err(AppError::BadRequest(
            "Page number cannot be less than 1".to_string(),
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
pub(crate) struct ServerListParams {
    #[serde(default = "default_page")]
    page: u32,
    q: Option<String>,
    kind: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct RecordListParams {
    #[serde(default = "default_page")]
    page: u32,
    server: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct PlayerListParams {
    #[serde(default = "default_page")]
    page: u32,
    q: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct ServerListResponse {
    page: u32,
    servers: Vec<Server>,
}

#[derive(Serialize)]
pub(crate) struct ServerDetailResponse {
    server: Server,
    records: Vec<Record>,
}

#[derive(Serialize)]
pub(crate) struct RecordListResponse {
    page: u32,
    records: Vec<Record>,
}

#[derive(Serialize)]
pub(crate) struct PlayerListResponse {
    page: u32,
    players: Vec<Player>,
}

#[debug_handler]
pub(crate) async fn list_servers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ServerListParams>,
) -> Result<impl IntoResponse, AppError> {
    validate_page(params.page)?;

    let servers = state
        .db
        .list_servers(
            ServerFilter {
                q: params.q,
                kind: params.kind,
            },
            params.page,
        )
        .await?;

    Ok(Json(ServerListResponse {
        page: params.page,
        servers,
    }))
}

#[debug_handler]
pub(crate) async fn get_server(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let server = state
        .db
        .get_server(address.clone())
        .await?
        .ok_or(AppError::NotFound("Server is not tracked (yet)"))?;

    let records = state.db.records_for_server(address, RECENT_RECORDS).await?;

    Ok(Json(ServerDetailResponse { server, records }))
}

#[debug_handler]
pub(crate) async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordListParams>,
) -> Result<impl IntoResponse, AppError> {
    validate_page(params.page)?;

    let records = state.db.list_records(params.server, params.page).await?;

    Ok(Json(RecordListResponse {
        page: params.page,
        records,
    }))
}

#[debug_handler]
pub(crate) async fn list_players(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlayerListParams>,
) -> Result<impl IntoResponse, AppError> {
    validate_page(params.page)?;

    let players = state.db.list_players(params.q, params.page).await?;

    Ok(Json(PlayerListResponse {
        page: params.page,
        players,
    }))
}

#[debug_handler]
pub(crate) async fn get_player(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let player = state
        .db
        .get_player(uuid)
        .await?
        .ok_or(AppError::NotFound("Player is not tracked (yet)"))?;

    Ok(Json(player))
}
