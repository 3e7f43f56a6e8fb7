//! Eventchat - 活动实时消息服务
//!
//! 按活动划分的实时聊天（仅成员可发言）、供外部分组程序使用的用户特征导出，
//! 以及分组结果的广播转发。

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
pub mod websocket;
