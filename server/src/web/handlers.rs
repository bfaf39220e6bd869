use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use super::{AppState, WebError};
use crate::dispatcher;

pub const PGN_CONTENT_TYPE: &str = "application/x-chess-pgn";

#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub action: String,
}

fn expect_action(query: &ActionQuery, expected: &str) -> Result<(), WebError> {
    if query.action != expected {
        return Err(WebError::BadRequest(format!("unknown action {:?}", query.action)));
    }
    Ok(())
}

/// `GET /dgt?action=get_last_move`
pub async fn get_dgt(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActionQuery>,
) -> Result<impl IntoResponse, WebError> {
    expect_action(&query, "get_last_move")?;
    let snapshot = state.view.current();
    let last_move = snapshot
        .last_move
        .clone()
        .ok_or(WebError::NotFound("no move yet"))?;
    Ok(Json(last_move))
}

/// `GET /info?action=get_system_info`
pub async fn get_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActionQuery>,
) -> Result<impl IntoResponse, WebError> {
    expect_action(&query, "get_system_info")?;
    let snapshot = state.view.current();
    let info = snapshot
        .system_info
        .clone()
        .ok_or(WebError::NotFound("no system info yet"))?;
    Ok(Json(info))
}

/// `GET /pgn?action=get_pgn_file`: the current game as a download.
pub async fn get_pgn(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActionQuery>,
) -> Result<impl IntoResponse, WebError> {
    expect_action(&query, "get_pgn_file")?;
    let snapshot = state.view.current();
    let pgn = snapshot
        .last_move
        .as_ref()
        .and_then(|m| m.pgn.clone())
        .ok_or(WebError::NotFound("no game yet"))?;
    Ok((
        [
            (header::CONTENT_TYPE, PGN_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=game.pgn"),
        ],
        pgn,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ChannelForm {
    pub action: String,
    #[serde(default)]
    pub fen: Option<String>,
    /// JSON array of SAN tokens.
    #[serde(rename = "moveStack", default)]
    pub move_stack: Option<String>,
}

/// `POST /channel` with `action=broadcast`.
pub async fn post_channel(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ChannelForm>,
) -> Result<impl IntoResponse, WebError> {
    if form.action != "broadcast" {
        return Err(WebError::BadRequest(format!("unknown action {:?}", form.action)));
    }
    let move_stack: Vec<String> = match form.move_stack.as_deref() {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| WebError::BadRequest(format!("moveStack: {e}")))?,
        None => Vec::new(),
    };
    tracing::debug!(plies = move_stack.len(), "Spectator position received");

    if !dispatcher::broadcast_spectator_position(&state.bridge, form.fen, move_stack) {
        return Err(WebError::Unavailable);
    }
    Ok(axum::http::StatusCode::ACCEPTED)
}
