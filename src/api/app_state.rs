use std::sync::Arc;
use std::time::Duration;

use crate::config::HubConfig;
use crate::observability::AppMetrics;
use crate::services::{
    EventChatService, FeatureExporter, GroupBroadcastRelay, MembershipGate,
    create_feature_exporter, create_membership_gate,
};
use crate::storage::Directory;
use crate::websocket::hub::BroadcastHub;

/// Application state containing all shared services
#[derive(Clone)]
pub struct AppState {
    /// Per-scope broadcast hub
    pub hub: Arc<BroadcastHub>,
    /// Gated event chat publishing
    pub chat_service: Arc<EventChatService>,
    /// Pass-through relay for grouping results and descriptions
    pub group_relay: Arc<GroupBroadcastRelay>,
    /// Feature snapshot for the external grouping process
    pub feature_exporter: Arc<dyn FeatureExporter>,
    /// Shared counters
    pub metrics: Arc<AppMetrics>,
    /// Hub limits applied per connection
    pub hub_config: HubConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("hub", &self.hub)
            .field("chat_service", &"Arc<EventChatService>")
            .field("group_relay", &"Arc<GroupBroadcastRelay>")
            .field("feature_exporter", &"Arc<dyn FeatureExporter>")
            .field("hub_config", &self.hub_config)
            .finish()
    }
}

impl AppState {
    /// Wire the services around a directory
    pub fn new(
        directory: Arc<dyn Directory>,
        hub_config: HubConfig,
        lookup_timeout: Duration,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        let hub = Arc::new(BroadcastHub::with_buffer(hub_config.subscriber_buffer));
        let membership_gate: Arc<dyn MembershipGate> =
            Arc::from(create_membership_gate(Arc::clone(&directory), lookup_timeout));
        let chat_service = Arc::new(EventChatService::new(
            membership_gate,
            Arc::clone(&hub),
            Arc::clone(&metrics),
        ));
        let group_relay = Arc::new(GroupBroadcastRelay::new(
            Arc::clone(&hub),
            Arc::clone(&metrics),
        ));
        let feature_exporter: Arc<dyn FeatureExporter> =
            Arc::from(create_feature_exporter(directory));

        Self {
            hub,
            chat_service,
            group_relay,
            feature_exporter,
            metrics,
            hub_config,
        }
    }

    /// Create development application state with default limits
    pub fn development(directory: Arc<dyn Directory>) -> Self {
        let config = crate::config::AppConfig::development();
        Self::new(
            directory,
            config.hub,
            Duration::from_millis(config.directory.lookup_timeout_ms),
            Arc::new(AppMetrics::default()),
        )
    }
}
