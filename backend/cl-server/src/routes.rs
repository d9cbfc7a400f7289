use crate::socket::{connection_scope, handle_socket};

use cl_ws::Application;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use log::debug;
use uuid::Uuid;

/// Shared state for the WebSocket route
#[derive(Clone)]
pub struct AppState {
    pub application: Arc<dyn Application>,
    pub ws_path: String,
}

/// WebSocket upgrade handler
pub async fn handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let connection_id = Uuid::new_v4();
    debug!("WebSocket upgrade for connection {}", connection_id);

    let scope = connection_scope(&state.ws_path, connection_id);
    ws.on_upgrade(move |socket| handle_socket(socket, state.application, scope))
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let ws_path = state.ws_path.clone();
    Router::new().route(&ws_path, get(handler)).with_state(state)
}
