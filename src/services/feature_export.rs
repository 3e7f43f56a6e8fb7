//! 特征导出服务
//!
//! 为外部分组进程提供全部用户的特征快照（拉取模式）。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::models::FeatureRecord;
use crate::storage::Directory;

/// 特征导出 trait
#[async_trait]
pub trait FeatureExporter: Send + Sync {
    /// 导出全部用户的特征记录，未分组用户的分组标识为 0
    async fn export_all(&self) -> Result<Vec<FeatureRecord>>;
}

/// 基于目录服务的特征导出实现
pub struct DirectoryFeatureExporter {
    directory: Arc<dyn Directory>,
}

impl DirectoryFeatureExporter {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl FeatureExporter for DirectoryFeatureExporter {
    async fn export_all(&self) -> Result<Vec<FeatureRecord>> {
        let users = self.directory.all_users_with_traits_and_location().await?;
        let records: Vec<FeatureRecord> = users.into_iter().map(FeatureRecord::from).collect();
        debug!(count = records.len(), "Feature records exported");
        Ok(records)
    }
}

/// 创建特征导出服务
pub fn create_feature_exporter(directory: Arc<dyn Directory>) -> Box<dyn FeatureExporter> {
    Box::new(DirectoryFeatureExporter::new(directory))
}
