use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, Result};

/// 用户标识
pub type UserId = i64;

/// 分组标识
pub type GroupId = i64;

/// 兴趣特征权重：特征名 -> [0.0, 1.0] 内的权重
pub type TraitWeights = HashMap<String, f32>;

/// 用户实体
///
/// 权威数据归目录服务所有，这里只持有只读视图。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// 用户唯一标识
    pub id: UserId,
    /// 名
    pub name: String,
    /// 姓
    pub surname: String,
    /// 纬度（度）
    pub latitude: f64,
    /// 经度（度）
    pub longitude: f64,
    /// 兴趣特征权重
    #[serde(default)]
    pub traits: TraitWeights,
    /// 分组标识，分组计算前为空
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

impl User {
    /// 创建尚未声明特征、尚未分组的用户
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        surname: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            surname: surname.into(),
            latitude,
            longitude,
            traits: TraitWeights::new(),
            group_id: None,
        }
    }

    /// 设置特征权重
    pub fn with_traits<I, K>(mut self, traits: I) -> Self
    where
        I: IntoIterator<Item = (K, f32)>,
        K: Into<String>,
    {
        self.traits = traits.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    /// 设置分组
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// 校验坐标范围与特征权重范围
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::Validation(format!(
                "user {}: latitude {} out of range",
                self.id, self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::Validation(format!(
                "user {}: longitude {} out of range",
                self.id, self.longitude
            )));
        }
        if let Some((name, weight)) = self
            .traits
            .iter()
            .find(|(_, w)| !(0.0..=1.0).contains(*w))
        {
            return Err(AppError::Validation(format!(
                "user {}: trait '{}' weight {} out of [0, 1]",
                self.id, name, weight
            )));
        }
        Ok(())
    }

    /// 生成供特征导出使用的只读视图
    pub fn features(&self) -> UserFeatures {
        UserFeatures {
            user_id: self.id,
            traits: self.traits.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            group_id: self.group_id,
        }
    }
}

/// 目录服务返回的用户特征视图
#[derive(Debug, Clone, PartialEq)]
pub struct UserFeatures {
    pub user_id: UserId,
    pub traits: TraitWeights,
    pub latitude: f64,
    pub longitude: f64,
    pub group_id: Option<GroupId>,
}
