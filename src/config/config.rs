use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// HTTP 请求超时（秒）
    pub request_timeout: u64,
}

/// 广播中心配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HubConfig {
    /// 每个订阅者的缓冲队列长度，溢出时断开该订阅者
    pub subscriber_buffer: usize,
    /// 单个连接允许的最大订阅数
    pub max_subscriptions_per_connection: usize,
}

/// 目录服务后端类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    /// 进程内目录
    #[default]
    Memory,
    /// 远程 REST 目录
    Http,
}

/// 目录服务配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DirectoryConfig {
    /// 后端类型
    pub backend: DirectoryBackend,
    /// 内存后端的种子数据文件（JSON）
    pub seed_path: Option<PathBuf>,
    /// 远程目录地址
    pub base_url: Option<String>,
    /// 成员校验超时（毫秒）
    pub lookup_timeout_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录，按天滚动
    pub log_dir: Option<PathBuf>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 广播中心配置
    pub hub: HubConfig,
    /// 目录服务配置
    pub directory: DirectoryConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
                request_timeout: 30,
            },
            hub: HubConfig {
                subscriber_buffer: 64,
                max_subscriptions_per_connection: 32,
            },
            directory: DirectoryConfig {
                backend: DirectoryBackend::Memory,
                seed_path: None,
                base_url: None,
                lookup_timeout_ms: 2000,
            },
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "eventchat".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config.hub.subscriber_buffer = 256;
        config
    }
}
