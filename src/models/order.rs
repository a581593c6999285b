use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::actor::Actor;
use crate::state_machine::states::OrderState;

/// Priority of a clinical work order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPriority {
    Urgent,
    Normal,
    Scheduled,
}

impl Default for OrderPriority {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for OrderPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Urgent => write!(f, "urgent"),
            Self::Normal => write!(f, "normal"),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Append-only audit entry for one order transition. Never mutated after
/// insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub from_status: Option<OrderState>,
    pub to_status: OrderState,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// A unit of requested clinical work routed through the state machine.
///
/// Mutated only through [`crate::state_machine::OrderStateMachine`]
/// transitions. Never physically deleted: cancellation is a terminal status,
/// not a row removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Client-visible identity.
    pub order_id: Uuid,
    /// Internal surrogate key, assigned by the store.
    pub seq: u64,
    /// Source category, e.g. `RIS` (imaging) or `LIS` (lab).
    pub category: String,
    /// Free-form work type code, e.g. `MRI_BRAIN`.
    pub work_type: String,
    pub priority: OrderPriority,
    pub status: OrderState,
    pub requester: Actor,
    /// Set if and only if status has reached ACCEPTED.
    pub assignee: Option<Actor>,
    pub patient_id: String,
    /// Structured, versioned, extensible request payload.
    pub request_payload: Value,
    /// Structured result payload; empty object until work starts, frozen once
    /// the order is confirmed.
    pub result_payload: Value,
    /// Set by `confirm`; `None` until then.
    pub confirmed: Option<bool>,

    pub ordered_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub result_ready_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,

    pub history: Vec<OrderHistoryEntry>,
}

impl Order {
    pub fn new(
        seq: u64,
        requester: Actor,
        patient_id: impl Into<String>,
        category: impl Into<String>,
        work_type: impl Into<String>,
        priority: OrderPriority,
        request_payload: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_id: Uuid::new_v4(),
            seq,
            category: category.into(),
            work_type: work_type.into(),
            priority,
            status: OrderState::Ordered,
            requester,
            assignee: None,
            patient_id: patient_id.into(),
            request_payload,
            result_payload: Value::Object(serde_json::Map::new()),
            confirmed: None,
            ordered_at: now,
            accepted_at: None,
            started_at: None,
            result_ready_at: None,
            confirmed_at: None,
            cancelled_at: None,
            history: Vec::new(),
        }
    }

    /// True while the result payload holds no keys.
    pub fn result_is_empty(&self) -> bool {
        match &self.result_payload {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }

    /// Record the timestamp for a state just reached.
    pub fn stamp(&mut self, state: OrderState, at: DateTime<Utc>) {
        match state {
            OrderState::Ordered => self.ordered_at = at,
            OrderState::Accepted => self.accepted_at = Some(at),
            OrderState::InProgress => self.started_at = Some(at),
            OrderState::ResultReady => self.result_ready_at = Some(at),
            OrderState::Confirmed => self.confirmed_at = Some(at),
            OrderState::Cancelled => self.cancelled_at = Some(at),
        }
    }
}
