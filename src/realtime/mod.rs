//! Realtime message events
//!
//! In-process event bus for chat-message inserts, mirroring the hosted
//! backend's insert-event subscription. Subscribers filter by session id;
//! lagged receivers drop events rather than blocking publishers.

mod events;

pub use events::{EventType, MessageEvent, SubscriptionFilter};

use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

/// Default broadcast channel capacity
const CHANNEL_CAPACITY: usize = 256;

/// Broadcast bus for message events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MessageEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Returns the number of receivers it reached.
    pub fn publish(&self, event: MessageEvent) -> usize {
        match self.sender.send(event) {
            Ok(n) => n,
            // no live subscribers
            Err(_) => 0,
        }
    }

    /// Subscribe to events matching the filter
    pub fn subscribe(&self, filter: SubscriptionFilter) -> impl Stream<Item = MessageEvent> {
        BroadcastStream::new(self.sender.subscribe()).filter_map(move |item| match item {
            Ok(event) if filter.matches(&event) => Some(event),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Realtime subscriber lagged, events dropped");
                None
            }
        })
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use uuid::Uuid;

    #[tokio::test]
    async fn filtered_subscription_only_sees_matching_session() {
        let bus = EventBus::new();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();

        let mut sub = Box::pin(bus.subscribe(SubscriptionFilter::session(session_a)));

        bus.publish(MessageEvent::inserted(
            session_b,
            ChatMessage::user("other session"),
        ));
        bus.publish(MessageEvent::inserted(
            session_a,
            ChatMessage::user("for us"),
        ));

        let event = sub.next().await.unwrap();
        assert_eq!(event.session_id, session_a);
        assert_eq!(event.message.content, "for us");
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_error() {
        let bus = EventBus::new();
        let reached = bus.publish(MessageEvent::inserted(
            Uuid::new_v4(),
            ChatMessage::user("into the void"),
        ));
        assert_eq!(reached, 0);
    }
}
