use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::order::Order;

/// The kind of transition being applied to an order. Drives the role map,
/// the emitted event name, and the human-readable message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Create,
    Accept,
    Start,
    SaveResult,
    SubmitResult,
    Confirm,
    Cancel,
}

impl TransitionKind {
    /// Logical event name published on each successful transition.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Create => "order.created",
            Self::Accept => "order.accepted",
            Self::Start => "order.started",
            Self::SaveResult => "order.result_saved",
            Self::SubmitResult => "order.result_ready",
            Self::Confirm => "order.confirmed",
            Self::Cancel => "order.cancelled",
        }
    }

    /// Fill the message template for this transition.
    pub fn message(&self, order: &Order, actor_id: &str) -> String {
        match self {
            Self::Create => format!(
                "{} order {} created for patient {}",
                order.category, order.work_type, order.patient_id
            ),
            Self::Accept => format!("order {} accepted by {}", order.work_type, actor_id),
            Self::Start => format!("work started on order {} by {}", order.work_type, actor_id),
            Self::SaveResult => format!("draft result saved on order {}", order.work_type),
            Self::SubmitResult => format!("result ready for order {}", order.work_type),
            Self::Confirm => format!("result confirmed for order {}", order.work_type),
            Self::Cancel => format!("order {} cancelled by {}", order.work_type, actor_id),
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Accept => "accept",
            Self::Start => "start",
            Self::SaveResult => "save_result",
            Self::SubmitResult => "submit_result",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
        };
        write!(f, "{name}")
    }
}
