use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::events::TransitionKind;
use super::guards;
use super::states::OrderState;
use crate::error::{CoreError, Result};
use crate::events::fanout::{NotificationFanout, OrderTransitionEvent};
use crate::models::actor::Actor;
use crate::models::order::{Order, OrderHistoryEntry, OrderPriority};
use crate::store::OrderStore;

/// Request payload for creating a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub requester: Actor,
    pub patient_id: String,
    pub category: String,
    pub work_type: String,
    #[serde(default)]
    pub priority: OrderPriority,
    #[serde(default)]
    pub request_payload: Value,
}

/// Enforces legal transitions on orders and emits domain events.
///
/// Every transition runs under the order's exclusive lock: precondition and
/// role checks first, then mutation, history append and timestamp, then the
/// notification. A rejected transition mutates nothing and emits nothing,
/// and the write is visible before the event (write-then-notify).
pub struct OrderStateMachine {
    store: Arc<OrderStore>,
    fanout: NotificationFanout,
}

impl OrderStateMachine {
    pub fn new(store: Arc<OrderStore>, fanout: NotificationFanout) -> Self {
        Self { store, fanout }
    }

    pub fn store(&self) -> &Arc<OrderStore> {
        &self.store
    }

    /// Create a new order in state ORDERED.
    pub async fn create(&self, request: CreateOrderRequest) -> Result<Order> {
        if request.patient_id.trim().is_empty() {
            return Err(CoreError::validation("patient_id must not be empty"));
        }
        if request.requester.id.trim().is_empty() {
            return Err(CoreError::validation("requester id must not be empty"));
        }
        if request.category.trim().is_empty() {
            return Err(CoreError::validation("category must not be empty"));
        }
        if request.work_type.trim().is_empty() {
            return Err(CoreError::validation("work_type must not be empty"));
        }
        if !guards::allowed_roles(TransitionKind::Create).contains(&request.requester.role) {
            return Err(CoreError::forbidden(
                request.requester.to_string(),
                "create",
                format!("role {} may not create orders", request.requester.role),
            ));
        }

        let mut order = Order::new(
            self.store.next_seq(),
            request.requester.clone(),
            request.patient_id,
            request.category,
            request.work_type,
            request.priority,
            request.request_payload,
        );

        let now = order.ordered_at;
        order.history.push(OrderHistoryEntry {
            from_status: None,
            to_status: OrderState::Ordered,
            actor: request.requester.clone(),
            occurred_at: now,
            reason: None,
        });

        let snapshot = order.clone();
        self.store.insert(order);
        info!(order_id = %snapshot.order_id, category = %snapshot.category, "order created");

        self.emit(&snapshot, None, TransitionKind::Create, &request.requester);
        Ok(snapshot)
    }

    /// Accept an order; legal only from ORDERED. Sets the assignee.
    pub async fn accept(&self, order_id: Uuid, worker: &Actor) -> Result<Order> {
        self.transition(order_id, worker, TransitionKind::Accept, OrderState::Accepted, None, |order, actor| {
            order.assignee = Some(actor.clone());
            Ok(())
        })
        .await
    }

    /// Start work; legal only from ACCEPTED, by the assignee or an override.
    pub async fn start(&self, order_id: Uuid, actor: &Actor) -> Result<Order> {
        self.transition(
            order_id,
            actor,
            TransitionKind::Start,
            OrderState::InProgress,
            None,
            |_, _| Ok(()),
        )
        .await
    }

    /// Merge a partial result into the result payload without transitioning
    /// status. Supports draft saves while IN_PROGRESS.
    pub async fn save_result(
        &self,
        order_id: Uuid,
        actor: &Actor,
        partial_result: Value,
    ) -> Result<Order> {
        let entry = self
            .store
            .entry(order_id)
            .ok_or_else(|| CoreError::not_found(format!("order {order_id}")))?;
        let mut order = entry.lock().await;

        guards::check_state(&order, TransitionKind::SaveResult)?;
        guards::check_actor(&order, actor, TransitionKind::SaveResult)?;

        let partial = match partial_result {
            Value::Object(map) => map,
            other => {
                return Err(CoreError::validation(format!(
                    "partial result must be a JSON object, got {other}"
                )))
            }
        };

        if let Value::Object(existing) = &mut order.result_payload {
            for (key, value) in partial {
                existing.insert(key, value);
            }
        } else {
            order.result_payload = Value::Object(partial);
        }

        debug!(order_id = %order.order_id, "draft result saved");
        let snapshot = order.clone();
        drop(order);

        self.emit(
            &snapshot,
            Some(snapshot.status),
            TransitionKind::SaveResult,
            actor,
        );
        Ok(snapshot)
    }

    /// Publish the result; legal from IN_PROGRESS with a non-empty result
    /// payload. Transitions to RESULT_READY.
    pub async fn submit_result(&self, order_id: Uuid, actor: &Actor) -> Result<Order> {
        self.transition(
            order_id,
            actor,
            TransitionKind::SubmitResult,
            OrderState::ResultReady,
            None,
            |order, _| {
                if order.result_is_empty() {
                    return Err(CoreError::validation(
                        "result payload is empty; save a result before submitting",
                    ));
                }
                Ok(())
            },
        )
        .await
    }

    /// Confirm correctness; legal only from RESULT_READY. Freezes the result
    /// payload.
    pub async fn confirm(&self, order_id: Uuid, actor: &Actor) -> Result<Order> {
        self.transition(
            order_id,
            actor,
            TransitionKind::Confirm,
            OrderState::Confirmed,
            None,
            |order, _| {
                order.confirmed = Some(true);
                Ok(())
            },
        )
        .await
    }

    /// Cancel; legal from any non-terminal state, with a non-empty reason.
    pub async fn cancel(&self, order_id: Uuid, actor: &Actor, reason: &str) -> Result<Order> {
        if reason.trim().is_empty() {
            return Err(CoreError::validation("cancellation requires a reason"));
        }
        self.transition(
            order_id,
            actor,
            TransitionKind::Cancel,
            OrderState::Cancelled,
            Some(reason.to_string()),
            |_, _| Ok(()),
        )
        .await
    }

    /// Apply one status transition atomically under the order's lock.
    ///
    /// `mutate` must validate before it writes; it runs after the state and
    /// actor guards and before the status/history/timestamp writes.
    async fn transition<F>(
        &self,
        order_id: Uuid,
        actor: &Actor,
        kind: TransitionKind,
        target: OrderState,
        reason: Option<String>,
        mutate: F,
    ) -> Result<Order>
    where
        F: FnOnce(&mut Order, &Actor) -> Result<()>,
    {
        let entry = self
            .store
            .entry(order_id)
            .ok_or_else(|| CoreError::not_found(format!("order {order_id}")))?;
        let mut order = entry.lock().await;

        guards::check_state(&order, kind)?;
        guards::check_actor(&order, actor, kind)?;
        mutate(&mut order, actor)?;

        let from = order.status;
        let now = Utc::now();
        order.status = target;
        order.stamp(target, now);
        order.history.push(OrderHistoryEntry {
            from_status: Some(from),
            to_status: target,
            actor: actor.clone(),
            occurred_at: now,
            reason,
        });

        info!(
            order_id = %order.order_id,
            from = %from,
            to = %target,
            actor = %actor,
            "order transition"
        );

        let snapshot = order.clone();
        drop(order);

        self.emit(&snapshot, Some(from), kind, actor);
        Ok(snapshot)
    }

    fn emit(&self, order: &Order, from: Option<OrderState>, kind: TransitionKind, actor: &Actor) {
        let event = OrderTransitionEvent {
            order_id: order.order_id,
            patient_id: order.patient_id.clone(),
            category: order.category.clone(),
            work_type: order.work_type.clone(),
            from_status: from,
            to_status: order.status,
            actor: actor.clone(),
            message: kind.message(order, &actor.id),
            occurred_at: Utc::now(),
            requester_id: order.requester.id.clone(),
            assignee_id: order.assignee.as_ref().map(|a| a.id.clone()),
        };
        self.fanout.order_transition(kind.event_name(), &event);
    }
}
