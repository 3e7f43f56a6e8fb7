use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::user::UserId;

/// 事件标识
pub type EventId = i64;

/// 社交事件
///
/// 成员集合是无序且去重的，同一用户重复加入不会产生重复成员。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// 事件唯一标识
    pub id: EventId,
    /// 事件描述
    pub description: String,
    /// 纬度
    pub latitude: f64,
    /// 经度
    pub longitude: f64,
    /// 成员用户标识
    #[serde(default, alias = "userIds")]
    pub members: HashSet<UserId>,
}

impl Event {
    /// 创建没有成员的事件
    pub fn new(id: EventId, description: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            description: description.into(),
            latitude,
            longitude,
            members: HashSet::new(),
        }
    }

    /// 添加成员，已存在时返回 false
    pub fn add_member(&mut self, user_id: UserId) -> bool {
        self.members.insert(user_id)
    }

    /// 批量设置成员
    pub fn with_members(mut self, members: impl IntoIterator<Item = UserId>) -> Self {
        for member in members {
            self.add_member(member);
        }
        self
    }

    /// 判断用户是否为成员
    pub fn is_member(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }
}
