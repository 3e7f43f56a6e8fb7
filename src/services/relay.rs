//! 广播转发服务
//!
//! 将外部分组结果原样发布到 `groups`，将描述消息原样发布到 `description`。
//! 不做转换、过滤、去重或持久化。

use std::sync::Arc;
use tracing::debug;

use crate::models::{DescriptionMessage, GroupBatch};
use crate::observability::AppMetrics;
use crate::websocket::envelope::Broadcast;
use crate::websocket::hub::{BroadcastHub, PublishReport};
use crate::websocket::scope::Scope;

/// 分组结果广播转发
pub struct GroupBroadcastRelay {
    hub: Arc<BroadcastHub>,
    metrics: Arc<AppMetrics>,
}

impl GroupBroadcastRelay {
    pub fn new(hub: Arc<BroadcastHub>, metrics: Arc<AppMetrics>) -> Self {
        Self { hub, metrics }
    }

    /// 原样转发分组结果
    pub fn relay(&self, groups: GroupBatch) -> PublishReport {
        let count = groups.len();
        let report = self.hub.publish(&Scope::Groups, Broadcast::Groups(groups));
        self.metrics.record_group_broadcast();
        self.metrics.record_evictions(report.evicted);
        debug!(
            groups = count,
            subscribers = report.delivered,
            "Grouping result relayed"
        );
        report
    }

    /// 原样转发用户描述消息
    pub fn relay_description(&self, message: DescriptionMessage) -> PublishReport {
        let user_id = message.user_id;
        let report = self
            .hub
            .publish(&Scope::Description, Broadcast::Description(message));
        self.metrics.record_description();
        self.metrics.record_evictions(report.evicted);
        debug!(user_id, subscribers = report.delivered, "Description relayed");
        report
    }
}
