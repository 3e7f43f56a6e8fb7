use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{EventId, GroupId, TraitWeights, UserFeatures, UserId};
use crate::storage::directory::Directory;

/// 远程目录返回的事件摘要
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSummary {
    #[serde(default)]
    user_ids: Vec<UserId>,
}

/// 远程目录返回的用户特征
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFeatures {
    group_id: Option<GroupId>,
    user_id: UserId,
    top_traits: Option<TraitWeights>,
    latitude: f64,
    longitude: f64,
}

impl From<RemoteFeatures> for UserFeatures {
    fn from(remote: RemoteFeatures) -> Self {
        Self {
            user_id: remote.user_id,
            traits: remote.top_traits.unwrap_or_default(),
            latitude: remote.latitude,
            longitude: remote.longitude,
            group_id: remote.group_id,
        }
    }
}

/// 通过 REST 接口访问外部用户/事件服务的目录实现
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDirectory {
    /// 创建远程目录，`timeout` 作用于每个请求
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn is_member(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let url = self.url(&format!("/api/events/{}", event_id));
        debug!(%url, user_id, "Directory membership lookup");

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(AppError::Directory(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let event: EventSummary = response.json().await?;
        Ok(event.user_ids.contains(&user_id))
    }

    async fn all_users_with_traits_and_location(&self) -> Result<Vec<UserFeatures>> {
        let url = self.url("/api/users/features");
        debug!(%url, "Directory feature listing");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Directory(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let users: Vec<RemoteFeatures> = response.json().await?;
        Ok(users.into_iter().map(UserFeatures::from).collect())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
