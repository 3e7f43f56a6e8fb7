//! 目录适配层模块
//!
//! 提供用户/事件目录的只读查询，支持进程内和远程 REST 两种后端。

pub mod directory;
pub mod factory;
pub mod http;
pub mod memory;

pub use directory::Directory;
pub use factory::DirectoryFactory;
pub use http::HttpDirectory;
pub use memory::{DirectorySeed, InMemoryDirectory};
