//! 目录工厂模块
//!
//! 根据配置创建相应的目录服务实例。

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{DirectoryBackend, DirectoryConfig};
use crate::error::{AppError, Result};
use crate::storage::directory::Directory;
use crate::storage::http::HttpDirectory;
use crate::storage::memory::InMemoryDirectory;

/// 目录工厂
pub struct DirectoryFactory;

impl DirectoryFactory {
    /// 根据配置创建目录实例
    pub async fn create(config: &DirectoryConfig) -> Result<Arc<dyn Directory>> {
        match config.backend {
            DirectoryBackend::Memory => {
                let directory = match &config.seed_path {
                    Some(path) => InMemoryDirectory::load_seed_file(path).await?,
                    None => InMemoryDirectory::new(),
                };
                info!("Using in-memory directory");
                Ok(Arc::new(directory))
            }
            DirectoryBackend::Http => {
                let base_url = config.base_url.as_deref().ok_or_else(|| {
                    AppError::Config("directory.base_url is required for the http backend".into())
                })?;
                let directory =
                    HttpDirectory::new(base_url, Duration::from_millis(config.lookup_timeout_ms))?;
                info!(base_url, "Using HTTP directory");
                Ok(Arc::new(directory))
            }
        }
    }
}
