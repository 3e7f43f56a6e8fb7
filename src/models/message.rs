//! 实时消息载荷
//!
//! 聊天消息、描述消息与分组结果都是瞬态值，发送即创建、投递或丢弃后即销毁。

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::event::EventId;
use super::user::{GroupId, UserId};

/// 事件内聊天消息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub event_id: EventId,
    pub sender_id: UserId,
    pub content: String,
}

impl ChatMessage {
    pub fn new(event_id: EventId, sender_id: UserId, content: impl Into<String>) -> Self {
        Self {
            event_id,
            sender_id,
            content: content.into(),
        }
    }
}

/// 用户自我描述消息，转发给特征抽取机器人
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionMessage {
    pub user_id: UserId,
    pub content: String,
}

/// 外部分组计算得到的一个分组
///
/// 仅用于校验分组结果的结构，转发时使用 [`GroupBatch`] 保留的原始 JSON。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupAssignment {
    /// 分组标识
    pub group_id: GroupId,
    /// 成员用户标识，顺序无意义
    #[serde(alias = "users")]
    pub member_ids: Vec<UserId>,
    /// 分组的主导特征
    #[serde(default)]
    pub top_traits: Vec<String>,
    /// 代表纬度
    pub latitude: Option<f64>,
    /// 代表经度
    pub longitude: Option<f64>,
}

/// 一次分组结果
///
/// 反序列化时按 [`GroupAssignment`] 校验结构，但保留收到的原始 JSON，
/// 序列化时原样输出。`users` 与 `memberIds` 哪个进来就哪个出去，
/// 缺失的坐标也不会补成 `null`。
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBatch {
    raw: serde_json::Value,
    len: usize,
}

impl GroupBatch {
    /// 空分组结果
    pub fn empty() -> Self {
        Self {
            raw: serde_json::Value::Array(Vec::new()),
            len: 0,
        }
    }

    /// 校验并保留一个 JSON 值
    pub fn from_value(raw: serde_json::Value) -> serde_json::Result<Self> {
        let groups = Vec::<GroupAssignment>::deserialize(&raw)?;
        Ok(Self {
            len: groups.len(),
            raw,
        })
    }

    /// 分组数量
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Serialize for GroupBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GroupBatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(serde::de::Error::custom)
    }
}
