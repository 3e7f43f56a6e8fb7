//! WebSocket Routes

use axum::{Router, routing::get};

use crate::api::app_state::AppState;
use crate::websocket::ws_handler;

/// 创建 WebSocket 路由器
pub fn create_ws_router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}
