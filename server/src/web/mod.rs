//! HTTP adapter: WebSocket push channel, pull endpoints and spectator submit.

pub mod handlers;
pub mod ws;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::bridge::EventLoopBridge;
use crate::dispatcher::DisplayCore;
use crate::registry::BroadcastRegistry;
use crate::state::StateView;

/// Shared by every handler.
pub struct AppState {
    pub registry: Arc<BroadcastRegistry>,
    pub view: StateView,
    pub bridge: EventLoopBridge<DisplayCore>,
}

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("dispatcher unavailable")]
    Unavailable,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Routes:
/// - `GET /event`: WebSocket push channel
/// - `GET /dgt?action=get_last_move`
/// - `GET /info?action=get_system_info`
/// - `GET /pgn?action=get_pgn_file`
/// - `POST /channel`: spectator position submit
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/event", get(ws::ws_events))
        .route("/dgt", get(handlers::get_dgt))
        .route("/info", get(handlers::get_info))
        .route("/pgn", get(handlers::get_pgn))
        .route("/channel", post(handlers::post_channel))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
