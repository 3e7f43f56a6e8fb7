//! 事件聊天服务
//!
//! 成员校验通过的消息发布到 `event-chat.<eventId>`，其余消息静默丢弃。

use std::sync::Arc;
use tracing::{debug, info};

use crate::models::ChatMessage;
use crate::observability::AppMetrics;
use crate::services::membership::{Authorization, MembershipGate};
use crate::websocket::envelope::Broadcast;
use crate::websocket::hub::BroadcastHub;
use crate::websocket::scope::Scope;

/// 聊天消息处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    /// 已发布，`subscribers` 为收到消息的订阅者数
    Delivered { subscribers: usize },
    /// 被拒绝，未发布
    Dropped(Authorization),
}

/// 事件聊天服务
pub struct EventChatService {
    gate: Arc<dyn MembershipGate>,
    hub: Arc<BroadcastHub>,
    metrics: Arc<AppMetrics>,
}

impl EventChatService {
    pub fn new(
        gate: Arc<dyn MembershipGate>,
        hub: Arc<BroadcastHub>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self { gate, hub, metrics }
    }

    /// 校验并投递消息
    pub async fn submit(&self, message: ChatMessage) -> ChatOutcome {
        let authorization = self.authorize(&message).await;
        self.deliver(message, authorization)
    }

    /// 校验发送者的成员资格
    pub async fn authorize(&self, message: &ChatMessage) -> Authorization {
        self.gate.check(message.event_id, message.sender_id).await
    }

    /// 按校验结果投递消息，只有 `Granted` 会发布
    pub fn deliver(&self, message: ChatMessage, authorization: Authorization) -> ChatOutcome {
        if !authorization.is_granted() {
            info!(
                event_id = message.event_id,
                sender_id = message.sender_id,
                reason = ?authorization,
                "Chat message dropped"
            );
            if authorization == Authorization::Unavailable {
                self.metrics.record_directory_failure();
            }
            self.metrics.record_chat_denied();
            return ChatOutcome::Dropped(authorization);
        }

        let scope = Scope::EventChat(message.event_id);
        let report = self.hub.publish(&scope, Broadcast::Chat(message));
        self.metrics.record_chat_delivered();
        self.metrics.record_evictions(report.evicted);
        debug!(
            scope = %scope,
            subscribers = report.delivered,
            evicted = report.evicted,
            "Chat message published"
        );

        ChatOutcome::Delivered {
            subscribers: report.delivered,
        }
    }
}
