use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::models::{Event, EventId, User, UserFeatures, UserId};
use crate::storage::directory::Directory;

/// 种子数据文件格式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySeed {
    pub users: Vec<User>,
    pub events: Vec<Event>,
}

/// 进程内目录实现
///
/// 用于开发环境和测试，数据不落盘。
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, User>>,
    events: RwLock<HashMap<EventId, Event>>,
}

impl InMemoryDirectory {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 从种子数据创建目录
    pub fn from_seed(seed: DirectorySeed) -> Result<Self> {
        let directory = Self::new();
        for user in seed.users {
            directory.upsert_user(user)?;
        }
        for event in seed.events {
            directory.upsert_event(event);
        }
        Ok(directory)
    }

    /// 从 JSON 种子文件加载目录
    pub async fn load_seed_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let seed: DirectorySeed = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            users = seed.users.len(),
            events = seed.events.len(),
            "Directory seed loaded"
        );
        Self::from_seed(seed)
    }

    /// 插入或替换用户
    pub fn upsert_user(&self, user: User) -> Result<()> {
        user.validate()?;
        self.users.write().insert(user.id, user);
        Ok(())
    }

    /// 插入或替换事件
    pub fn upsert_event(&self, event: Event) {
        self.events.write().insert(event.id, event);
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn is_member(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        Ok(self
            .events
            .read()
            .get(&event_id)
            .is_some_and(|event| event.is_member(user_id)))
    }

    async fn all_users_with_traits_and_location(&self) -> Result<Vec<UserFeatures>> {
        let mut users: Vec<UserFeatures> =
            self.users.read().values().map(User::features).collect();
        users.sort_by_key(|u| u.user_id);
        Ok(users)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        directory
            .upsert_user(User::new(7, "Ola", "Lis", 52.2, 21.0).with_traits([("chess", 0.8)]))
            .unwrap();
        directory
            .upsert_user(User::new(9, "Piotr", "Wilk", 52.3, 21.1))
            .unwrap();
        directory.upsert_event(Event::new(42, "Chess night", 52.2, 21.0).with_members([7, 9]));
        directory
    }

    #[tokio::test]
    async fn test_is_member() {
        let directory = seeded();
        assert!(directory.is_member(42, 7).await.unwrap());
        assert!(directory.is_member(42, 9).await.unwrap());
        assert!(!directory.is_member(42, 11).await.unwrap());
        assert!(!directory.is_member(99, 7).await.unwrap());
    }

    #[tokio::test]
    async fn test_all_users_sorted_with_groups() {
        let directory = seeded();
        directory
            .upsert_user(User::new(3, "Jan", "Kos", 50.0, 19.9).with_group(2))
            .unwrap();

        let users = directory.all_users_with_traits_and_location().await.unwrap();
        assert_eq!(users.iter().map(|u| u.user_id).collect::<Vec<_>>(), vec![3, 7, 9]);
        assert_eq!(users[0].group_id, Some(2));
        assert_eq!(users[1].group_id, None);
        assert!(users[2].traits.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_event_replaces_members() {
        let directory = seeded();
        directory.upsert_event(Event::new(42, "Chess night", 52.2, 21.0).with_members([7, 7, 11]));

        assert!(directory.is_member(42, 11).await.unwrap());
        assert!(!directory.is_member(42, 9).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_user() {
        let directory = InMemoryDirectory::new();
        let user = User::new(1, "A", "B", 0.0, 0.0).with_traits([("music", 2.0)]);
        assert!(directory.upsert_user(user).is_err());
        assert!(
            directory
                .all_users_with_traits_and_location()
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_load_seed_file() {
        let path = std::env::temp_dir().join(format!("eventchat-seed-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            r#"{
                "users": [{"id": 1, "name": "A", "surname": "B", "latitude": 52.1, "longitude": 20.0, "traits": {"music": 0.9}}],
                "events": [{"id": 42, "description": "Jam", "latitude": 52.1, "longitude": 20.0, "members": [1]}]
            }"#,
        )
        .await
        .unwrap();

        let directory = InMemoryDirectory::load_seed_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(directory.is_member(42, 1).await.unwrap());
        let users = directory.all_users_with_traits_and_location().await.unwrap();
        assert_eq!(users[0].traits.get("music"), Some(&0.9));
    }
}
