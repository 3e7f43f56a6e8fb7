//! Routes 模块
//!
//! 定义 API 路由。

pub mod feature_routes;
pub mod ws_routes;
