//! Feature Routes
//!
//! 特征导出接口，路径与原有分组客户端保持一致。

use crate::api::handlers::feature_handler::*;
use axum::{Router, routing::get};

use crate::api::app_state::AppState;

/// 创建特征导出路由器
pub fn create_feature_router() -> Router<AppState> {
    Router::new().route("/users/features", get(export_features))
}
