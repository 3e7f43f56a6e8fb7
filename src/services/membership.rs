//! 成员校验服务
//!
//! 聊天消息进入路由前，先向目录服务确认发送者是该事件的成员。
//! 目录服务出错或超时一律视为未授权（fail closed）。

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::{EventId, UserId};
use crate::storage::Directory;

/// 成员校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// 目录确认为成员
    Granted,
    /// 目录确认非成员
    Denied,
    /// 目录不可用或超时
    Unavailable,
}

impl Authorization {
    pub fn is_granted(self) -> bool {
        matches!(self, Authorization::Granted)
    }
}

/// 成员校验 trait
#[async_trait]
pub trait MembershipGate: Send + Sync {
    /// 查询发送者在事件中的成员资格
    async fn check(&self, event_id: EventId, sender_id: UserId) -> Authorization;

    /// 发送者是否被允许在事件中发言
    async fn authorize(&self, event_id: EventId, sender_id: UserId) -> bool {
        self.check(event_id, sender_id).await.is_granted()
    }
}

/// 基于目录服务的成员校验实现
pub struct DirectoryMembershipGate {
    directory: Arc<dyn Directory>,
    timeout: Duration,
}

impl DirectoryMembershipGate {
    /// 创建新的校验器，`timeout` 限制每次目录查询的耗时
    pub fn new(directory: Arc<dyn Directory>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }
}

impl DirectoryMembershipGate {
    /// 带超时的目录查询，超时转换为 `AppError::DirectoryTimeout`
    async fn lookup(&self, event_id: EventId, sender_id: UserId) -> Result<bool> {
        tokio::time::timeout(self.timeout, self.directory.is_member(event_id, sender_id))
            .await
            .map_err(|_| AppError::DirectoryTimeout(self.timeout.as_millis() as u64))?
    }
}

#[async_trait]
impl MembershipGate for DirectoryMembershipGate {
    async fn check(&self, event_id: EventId, sender_id: UserId) -> Authorization {
        match self.lookup(event_id, sender_id).await {
            Ok(true) => {
                debug!(event_id, sender_id, "Membership confirmed");
                Authorization::Granted
            }
            Ok(false) => {
                debug!(event_id, sender_id, "Sender is not a member");
                Authorization::Denied
            }
            Err(e) => {
                warn!(
                    event_id,
                    sender_id,
                    backend = self.directory.backend_name(),
                    error = %e,
                    "Directory lookup failed, denying"
                );
                Authorization::Unavailable
            }
        }
    }
}

/// 创建成员校验服务
pub fn create_membership_gate(
    directory: Arc<dyn Directory>,
    timeout: Duration,
) -> Box<dyn MembershipGate> {
    Box::new(DirectoryMembershipGate::new(directory, timeout))
}
