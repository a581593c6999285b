pub mod fanout;
pub mod publisher;

pub use fanout::{NotificationFanout, OrderTransitionEvent};
pub use publisher::{EventPublisher, PublishError, PublishedEvent, Topic};
