use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::events::publisher::{EventPublisher, Topic};
use crate::models::actor::Actor;
use crate::models::inference::InferenceJob;
use crate::state_machine::states::OrderState;

/// Domain event emitted for every successful order transition.
#[derive(Debug, Clone, Serialize)]
pub struct OrderTransitionEvent {
    pub order_id: Uuid,
    pub patient_id: String,
    pub category: String,
    pub work_type: String,
    pub from_status: Option<OrderState>,
    pub to_status: OrderState,
    pub actor: Actor,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
    /// Topics this event was routed to, for subscribers that care.
    #[serde(skip)]
    pub requester_id: String,
    #[serde(skip)]
    pub assignee_id: Option<String>,
}

/// Routes domain events to the interested topics: the category's role group,
/// the owning requester, and the assigned worker when there is one.
///
/// Delivery is at-most-once best-effort; failures are logged and never
/// propagated, so notification problems cannot affect order or job state.
#[derive(Debug, Clone)]
pub struct NotificationFanout {
    publisher: EventPublisher,
}

impl NotificationFanout {
    pub fn new(publisher: EventPublisher) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Broadcast one order transition to its interested topics.
    pub fn order_transition(&self, event_name: &str, event: &OrderTransitionEvent) {
        let context = match serde_json::to_value(event) {
            Ok(value) => value,
            Err(e) => {
                warn!(order_id = %event.order_id, error = %e, "failed to serialize order event");
                return;
            }
        };

        let mut topics = vec![
            Topic::RoleGroup(event.category.clone()),
            Topic::Requester(event.requester_id.clone()),
        ];
        if let Some(assignee_id) = &event.assignee_id {
            topics.push(Topic::Assignee(assignee_id.clone()));
        }

        for topic in topics {
            if let Err(e) = self.publisher.publish(topic.clone(), event_name, context.clone()) {
                warn!(%topic, event_name, error = %e, "event delivery failed");
            }
        }
    }

    /// Broadcast a job lifecycle event to the jobs topic.
    pub fn job_event(&self, event_name: &str, job: &InferenceJob) {
        let context = json!({
            "job_id": job.job_id,
            "model_code": job.model_code,
            "patient_id": job.patient_id,
            "status": job.status,
            "progress_percent": job.progress_percent,
            "progress_text": job.progress_text,
        });
        if let Err(e) = self.publisher.publish(Topic::Jobs, event_name, context) {
            warn!(job_id = %job.job_id, event_name, error = %e, "event delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn order_event_fans_out_to_role_requester_and_assignee() {
        let fanout = NotificationFanout::new(EventPublisher::default());
        let mut rx = fanout.publisher().subscribe();

        let event = OrderTransitionEvent {
            order_id: Uuid::new_v4(),
            patient_id: "patient-1".to_string(),
            category: "RIS".to_string(),
            work_type: "MRI_BRAIN".to_string(),
            from_status: Some(OrderState::Ordered),
            to_status: OrderState::Accepted,
            actor: Actor::worker("tech-lee"),
            message: "order MRI_BRAIN accepted by tech-lee".to_string(),
            occurred_at: Utc::now(),
            requester_id: "dr-kim".to_string(),
            assignee_id: Some("tech-lee".to_string()),
        };
        fanout.order_transition("order.accepted", &event);

        let mut topics = Vec::new();
        for _ in 0..3 {
            topics.push(rx.recv().await.unwrap().topic);
        }
        assert!(topics.contains(&Topic::RoleGroup("RIS".to_string())));
        assert!(topics.contains(&Topic::Requester("dr-kim".to_string())));
        assert!(topics.contains(&Topic::Assignee("tech-lee".to_string())));
    }
}
