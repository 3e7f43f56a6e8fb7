//! API 模块
//!
//! 提供 REST 特征导出接口和 WebSocket 入口。

pub mod app_state;
pub mod handlers;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use crate::api::app_state::AppState;
use crate::observability::metrics_middleware;
use crate::security::middleware::security_headers_middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(app_state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .merge(routes::feature_routes::create_feature_router())
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api", api)
        .merge(routes::ws_routes::create_ws_router())
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&app_state.metrics),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
