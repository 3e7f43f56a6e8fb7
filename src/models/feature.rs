use serde::{Deserialize, Serialize};

use super::user::{GroupId, TraitWeights, UserFeatures, UserId};

/// 尚未分组用户的导出分组标识
pub const UNASSIGNED_GROUP_ID: GroupId = 0;

/// 特征导出记录
///
/// 每次导出重新生成，创建后不再修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub top_traits: TraitWeights,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<UserFeatures> for FeatureRecord {
    fn from(features: UserFeatures) -> Self {
        Self {
            group_id: features.group_id.unwrap_or(UNASSIGNED_GROUP_ID),
            user_id: features.user_id,
            top_traits: features.traits,
            latitude: features.latitude,
            longitude: features.longitude,
        }
    }
}
