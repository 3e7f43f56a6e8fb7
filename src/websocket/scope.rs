//! Broadcast Scopes
//!
//! A scope is a named broadcast channel: one per event chat, plus the fixed
//! `groups` and `description` channels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::EventId;

const EVENT_CHAT_PREFIX: &str = "event-chat.";
const GROUPS: &str = "groups";
const DESCRIPTION: &str = "description";

/// STOMP-style destination prefix used by the original web clients
const TOPIC_PREFIX: &str = "/topic/";

/// Logical broadcast scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Scope {
    /// `event-chat.<eventId>`
    EventChat(EventId),
    /// `groups`
    Groups,
    /// `description`
    Description,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::EventChat(event_id) => write!(f, "{}{}", EVENT_CHAT_PREFIX, event_id),
            Scope::Groups => f.write_str(GROUPS),
            Scope::Description => f.write_str(DESCRIPTION),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown scope: {0}")]
pub struct ScopeParseError(String);

impl FromStr for Scope {
    type Err = ScopeParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.strip_prefix(TOPIC_PREFIX).unwrap_or(raw);
        match name {
            GROUPS => Ok(Scope::Groups),
            DESCRIPTION => Ok(Scope::Description),
            _ => name
                .strip_prefix(EVENT_CHAT_PREFIX)
                .and_then(|id| id.parse::<EventId>().ok())
                .map(Scope::EventChat)
                .ok_or_else(|| ScopeParseError(raw.to_string())),
        }
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.to_string()
    }
}

impl TryFrom<String> for Scope {
    type Error = ScopeParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("event-chat.42", Scope::EventChat(42))]
    #[case("/topic/event-chat.7", Scope::EventChat(7))]
    #[case("groups", Scope::Groups)]
    #[case("/topic/groups", Scope::Groups)]
    #[case("description", Scope::Description)]
    fn test_parse_scope(#[case] raw: &str, #[case] expected: Scope) {
        assert_eq!(raw.parse::<Scope>().unwrap(), expected);
    }

    #[rstest]
    #[case("event-chat.")]
    #[case("event-chat.abc")]
    #[case("chat.42")]
    #[case("")]
    fn test_parse_invalid_scope(#[case] raw: &str) {
        assert!(raw.parse::<Scope>().is_err());
    }

    #[test]
    fn test_display_names_are_distinct() {
        assert_eq!(Scope::EventChat(42).to_string(), "event-chat.42");
        assert_ne!(Scope::EventChat(1).to_string(), Scope::EventChat(11).to_string());
        assert_eq!(Scope::Groups.to_string(), "groups");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Scope::EventChat(42)).unwrap();
        assert_eq!(json, r#""event-chat.42""#);
        let scope: Scope = serde_json::from_str(r#""groups""#).unwrap();
        assert_eq!(scope, Scope::Groups);
    }
}
