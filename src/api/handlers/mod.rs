//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod feature_handler;

pub use feature_handler::*;
