use eventchat::api::{self, app_state::AppState};
use eventchat::config::ConfigLoader;
use eventchat::observability::{
    AppMetrics, HealthCheckResult, ObservabilityState, create_observability_router, init_tracing,
};
use eventchat::storage::{Directory, DirectoryFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load()?;
    let _log_guard = init_tracing(env!("CARGO_PKG_NAME"), &config.logging);

    info!("Starting {} ({})...", config.app_name, config.environment);

    ConfigLoader::validate(&config)?;
    info!("Configuration loaded successfully");

    let directory = DirectoryFactory::create(&config.directory).await?;
    info!("Directory initialized (backend: {})", directory.backend_name());

    let metrics = Arc::new(AppMetrics::default());
    let observability_state = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&metrics),
    ));
    observability_state
        .add_health_check(probe_directory(directory.as_ref()).await)
        .await;

    let app_state = AppState::new(
        directory,
        config.hub.clone(),
        Duration::from_millis(config.directory.lookup_timeout_ms),
        metrics,
    );
    info!("Application state created");

    let api_router = api::create_router(
        app_state,
        Duration::from_secs(config.server.request_timeout),
    );
    let router = create_observability_router(observability_state).merge(api_router);
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Check the directory answers before accepting traffic
async fn probe_directory(directory: &dyn Directory) -> HealthCheckResult {
    let start = Instant::now();
    let result = directory.all_users_with_traits_and_location().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(users) => HealthCheckResult {
            name: "directory".to_string(),
            healthy: true,
            message: format!("{} users", users.len()),
            latency_ms,
        },
        Err(e) => {
            warn!("Directory probe failed: {}", e);
            HealthCheckResult {
                name: "directory".to_string(),
                healthy: false,
                message: e.to_string(),
                latency_ms,
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
