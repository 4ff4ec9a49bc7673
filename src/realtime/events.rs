//! Realtime event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ChatMessage;

/// Types of realtime events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    MessageInserted,
}

/// A realtime event carrying an inserted chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    pub message: ChatMessage,
}

impl MessageEvent {
    /// Create a message-inserted event
    pub fn inserted(session_id: Uuid, message: ChatMessage) -> Self {
        Self {
            event_type: EventType::MessageInserted,
            timestamp: Utc::now(),
            session_id,
            message,
        }
    }
}

/// Subscription filter for events
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    /// Only events for this session; `None` matches everything
    pub session_id: Option<Uuid>,
}

impl SubscriptionFilter {
    /// Filter down to a single session
    pub fn session(session_id: Uuid) -> Self {
        Self {
            session_id: Some(session_id),
        }
    }

    /// Check if an event matches this filter
    pub fn matches(&self, event: &MessageEvent) -> bool {
        match self.session_id {
            Some(id) => event.session_id == id,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        let event = MessageEvent::inserted(Uuid::new_v4(), ChatMessage::user("hi"));
        assert!(SubscriptionFilter::default().matches(&event));
    }

    #[test]
    fn session_filter_excludes_other_sessions() {
        let ours = Uuid::new_v4();
        let filter = SubscriptionFilter::session(ours);

        let matching = MessageEvent::inserted(ours, ChatMessage::user("hi"));
        let other = MessageEvent::inserted(Uuid::new_v4(), ChatMessage::user("hi"));

        assert!(filter.matches(&matching));
        assert!(!filter.matches(&other));
    }
}
