use async_trait::async_trait;

use crate::error::Result;
use crate::models::{EventId, UserFeatures, UserId};

/// 用户/事件目录 trait
///
/// 只读查询接口，权威数据由外部持久化存储维护。
/// 实现可能是远程服务，调用方需自行控制超时。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Directory: Send + Sync {
    /// 判断用户当前是否为事件成员
    async fn is_member(&self, event_id: EventId, user_id: UserId) -> Result<bool>;

    /// 列出全部用户的特征与坐标
    async fn all_users_with_traits_and_location(&self) -> Result<Vec<UserFeatures>>;

    /// 后端名称，用于日志与健康检查
    fn backend_name(&self) -> &'static str;
}
