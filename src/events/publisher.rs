use std::fmt;

use serde_json::Value;
use tokio::sync::broadcast;

/// Logical routing key for published events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Everyone working a category, e.g. the radiology group for `RIS`.
    RoleGroup(String),
    /// The physician who owns the order.
    Requester(String),
    /// The worker the order is assigned to.
    Assignee(String),
    /// Inference job lifecycle watchers.
    Jobs,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoleGroup(category) => write!(f, "role:{category}"),
            Self::Requester(id) => write!(f, "requester:{id}"),
            Self::Assignee(id) => write!(f, "assignee:{id}"),
            Self::Jobs => write!(f, "jobs"),
        }
    }
}

/// Event that has been published.
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub topic: Topic,
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Fire-and-forget event publisher over a broadcast channel.
///
/// Publishing never waits on subscriber delivery; a slow or absent subscriber
/// cannot stall a state transition.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to a topic.
    pub fn publish(
        &self,
        topic: Topic,
        event_name: impl Into<String>,
        context: Value,
    ) -> Result<(), PublishError> {
        let event = PublishedEvent {
            topic,
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        // A broadcast send only errors when there are no subscribers; events
        // are still considered published in that case.
        match self.sender.send(event) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Subscribe to all published events.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event channel is closed")]
    ChannelClosed,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}
