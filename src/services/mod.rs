//! 服务模块

pub mod chat;
pub mod feature_export;
pub mod membership;
pub mod relay;

pub use chat::{ChatOutcome, EventChatService};
pub use feature_export::{DirectoryFeatureExporter, FeatureExporter, create_feature_exporter};
pub use membership::{
    Authorization, DirectoryMembershipGate, MembershipGate, create_membership_gate,
};
pub use relay::GroupBroadcastRelay;
