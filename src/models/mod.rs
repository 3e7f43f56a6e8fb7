//! 核心数据模型模块
//!
//! 定义目录视图（User, Event）、瞬态消息以及特征导出记录。

pub mod event;
pub mod feature;
pub mod message;
pub mod user;

pub use event::{Event, EventId};
pub use feature::{FeatureRecord, UNASSIGNED_GROUP_ID};
pub use message::{ChatMessage, DescriptionMessage, GroupAssignment, GroupBatch};
pub use user::{GroupId, TraitWeights, User, UserFeatures, UserId};
