use crate::config::config::{AppConfig, DirectoryBackend};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

/// 环境变量前缀，例如 `EVENTCHAT_SERVER__PORT=9000`
const ENV_PREFIX: &str = "EVENTCHAT_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序（后者覆盖前者）：
    /// 1. 开发环境默认值
    /// 2. ./config.toml
    /// 3. 环境变量
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        Figment::from(Serialized::defaults(AppConfig::development()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.hub.subscriber_buffer == 0 {
            return Err(ConfigValidationError::InvalidSubscriberBuffer);
        }

        if config.hub.max_subscriptions_per_connection == 0 {
            return Err(ConfigValidationError::InvalidSubscriptionLimit);
        }

        if config.directory.lookup_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidLookupTimeout);
        }

        if config.directory.backend == DirectoryBackend::Http
            && config
                .directory
                .base_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigValidationError::MissingDirectoryUrl);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("订阅者缓冲长度无效，必须大于 0")]
    InvalidSubscriberBuffer,

    #[error("单连接订阅上限无效，必须大于 0")]
    InvalidSubscriptionLimit,

    #[error("目录查询超时无效，必须大于 0")]
    InvalidLookupTimeout,

    #[error("HTTP 目录后端需要配置 directory.base_url")]
    MissingDirectoryUrl,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}
