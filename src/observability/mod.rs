//! 可观测性模块
//!
//! 提供 Prometheus 指标、结构化日志和健康检查。

use axum::{Json, Router, response::IntoResponse, routing::get};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

// ===== Simple Metrics (atomics rendered as Prometheus text) =====

/// 应用指标
#[derive(Debug, Default)]
pub struct AppMetrics {
    pub http_requests_total: AtomicU64,
    pub http_request_duration_sum: AtomicU64,
    pub ws_connections_active: AtomicI64,
    pub chat_messages_delivered_total: AtomicU64,
    pub chat_messages_denied_total: AtomicU64,
    pub directory_failures_total: AtomicU64,
    pub group_broadcasts_total: AtomicU64,
    pub description_messages_total: AtomicU64,
    pub subscribers_evicted_total: AtomicU64,
    pub malformed_frames_total: AtomicU64,
    pub feature_exports_total: AtomicU64,
    pub errors_total: AtomicU64,
}

impl AppMetrics {
    /// 记录 HTTP 请求
    pub fn record_http_request(&self, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        self.http_request_duration_sum
            .fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// 记录 WebSocket 连接变化
    pub fn record_connection(&self, delta: i64) {
        self.ws_connections_active.fetch_add(delta, Ordering::Relaxed);
    }

    /// 记录已投递的聊天消息
    pub fn record_chat_delivered(&self) {
        self.chat_messages_delivered_total
            .fetch_add(1, Ordering::Relaxed);
    }

    /// 记录被拒绝的聊天消息
    pub fn record_chat_denied(&self) {
        self.chat_messages_denied_total
            .fetch_add(1, Ordering::Relaxed);
    }

    /// 记录目录服务故障（含超时）
    pub fn record_directory_failure(&self) {
        self.directory_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录分组广播
    pub fn record_group_broadcast(&self) {
        self.group_broadcasts_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录描述消息
    pub fn record_description(&self) {
        self.description_messages_total
            .fetch_add(1, Ordering::Relaxed);
    }

    /// 记录被驱逐的订阅者
    pub fn record_evictions(&self, count: usize) {
        if count > 0 {
            self.subscribers_evicted_total
                .fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// 记录格式错误的帧
    pub fn record_malformed_frame(&self) {
        self.malformed_frames_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录特征导出
    pub fn record_feature_export(&self) {
        self.feature_exports_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录错误
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let counters: [(&str, &str, &str, String); 12] = [
            (
                "http_requests_total",
                "counter",
                "Total HTTP requests",
                self.http_requests_total.load(Ordering::Relaxed).to_string(),
            ),
            (
                "http_request_duration_seconds_sum",
                "counter",
                "Total HTTP request duration in seconds",
                (self.http_request_duration_sum.load(Ordering::Relaxed) as f64 / 1000.0)
                    .to_string(),
            ),
            (
                "ws_connections_active",
                "gauge",
                "Open WebSocket connections",
                self.ws_connections_active.load(Ordering::Relaxed).to_string(),
            ),
            (
                "chat_messages_delivered_total",
                "counter",
                "Chat messages published to an event scope",
                self.chat_messages_delivered_total
                    .load(Ordering::Relaxed)
                    .to_string(),
            ),
            (
                "chat_messages_denied_total",
                "counter",
                "Chat messages dropped by the membership gate",
                self.chat_messages_denied_total
                    .load(Ordering::Relaxed)
                    .to_string(),
            ),
            (
                "directory_failures_total",
                "counter",
                "Directory lookups that failed or timed out",
                self.directory_failures_total.load(Ordering::Relaxed).to_string(),
            ),
            (
                "group_broadcasts_total",
                "counter",
                "Grouping results relayed",
                self.group_broadcasts_total.load(Ordering::Relaxed).to_string(),
            ),
            (
                "description_messages_total",
                "counter",
                "Description messages relayed",
                self.description_messages_total
                    .load(Ordering::Relaxed)
                    .to_string(),
            ),
            (
                "subscribers_evicted_total",
                "counter",
                "Subscribers evicted on queue overflow",
                self.subscribers_evicted_total
                    .load(Ordering::Relaxed)
                    .to_string(),
            ),
            (
                "malformed_frames_total",
                "counter",
                "Inbound frames rejected at the boundary",
                self.malformed_frames_total.load(Ordering::Relaxed).to_string(),
            ),
            (
                "feature_exports_total",
                "counter",
                "Feature export requests served",
                self.feature_exports_total.load(Ordering::Relaxed).to_string(),
            ),
            (
                "errors_total",
                "counter",
                "Total errors",
                self.errors_total.load(Ordering::Relaxed).to_string(),
            ),
        ];

        let mut output = String::new();
        for (name, kind, help, value) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n"
            ));
        }
        output
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub checks: Vec<HealthCheck>,
}

/// 单个健康检查项
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    pub message: Option<String>,
    pub latency_ms: Option<u64>,
}

/// 健康检查结果
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub name: String,
    pub healthy: bool,
    pub message: String,
    pub latency_ms: u64,
}

/// 可观测性状态
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<AppMetrics>,
    pub health_checks: Arc<Mutex<Vec<HealthCheckResult>>>,
    pub start_time: DateTime<Utc>,
    pub version: String,
}

impl ObservabilityState {
    pub fn new(version: String, metrics: Arc<AppMetrics>) -> Self {
        Self {
            metrics,
            health_checks: Arc::new(Mutex::new(Vec::new())),
            start_time: Utc::now(),
            version,
        }
    }

    /// 添加健康检查结果
    pub async fn add_health_check(&self, result: HealthCheckResult) {
        let mut checks = self.health_checks.lock().await;
        checks.push(result);
        if checks.len() > 10 {
            checks.remove(0);
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }
}

// ===== Health Check Handlers =====

/// 获取完整健康状态
pub async fn health_check(
    state: axum::extract::State<Arc<ObservabilityState>>,
) -> impl IntoResponse {
    let checks = state.health_checks.lock().await;
    let all_healthy = checks.iter().all(|c| c.healthy);

    let health_status = HealthStatus {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        checks: checks
            .iter()
            .map(|c| HealthCheck {
                name: c.name.clone(),
                status: if c.healthy { "healthy" } else { "unhealthy" }.to_string(),
                message: Some(c.message.clone()),
                latency_ms: Some(c.latency_ms),
            })
            .collect(),
    };

    let status_code = if all_healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_status))
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// 就绪检查（检查依赖服务）
pub async fn readiness(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    let checks = state.health_checks.lock().await;
    let all_healthy = checks.iter().all(|c| c.healthy);

    if all_healthy {
        (axum::http::StatusCode::OK, "Ready")
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "Not Ready")
    }
}

/// Prometheus 指标端点
pub async fn metrics(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    (axum::http::StatusCode::OK, state.metrics.gather())
}

/// 版本信息端点
pub async fn version(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptime_seconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Structured Logging =====

/// 初始化结构化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `log_dir` 时额外写入按天滚动的
/// 日志文件，返回的 guard 需要在进程生命周期内持有。
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = if config.level.is_empty() {
        "info"
    } else {
        config.level.as_str()
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}={}", level, service_name, level)));

    let (file_writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", service_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.structured {
        registry
            .with(fmt::layer().json().with_target(true).with_line_number(true))
            .with(file_writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w)))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already set: {}", e);
    }

    guard
}

// ===== Request Metrics Middleware =====

/// 记录请求指标的中间件
pub async fn metrics_middleware(
    axum::extract::State(metrics): axum::extract::State<Arc<AppMetrics>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let start = std::time::Instant::now();

    let response = next.run(req).await;

    metrics.record_http_request(start.elapsed().as_millis() as u64);
    if response.status().is_server_error() {
        metrics.record_error();
    }

    response
}
