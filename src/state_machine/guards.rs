//! Precondition checks applied before any order mutation.
//!
//! The role map is fixed: which roles may attempt which transition, plus the
//! ownership rules (assignee for worker-side transitions, requester for
//! confirm/cancel). Guards return typed errors and never mutate.

use crate::error::{CoreError, Result};
use crate::models::actor::{Actor, ActorRole};
use crate::models::order::Order;
use crate::state_machine::events::TransitionKind;
use crate::state_machine::states::OrderState;

/// Roles allowed to attempt each transition, before ownership checks.
pub fn allowed_roles(kind: TransitionKind) -> &'static [ActorRole] {
    match kind {
        TransitionKind::Create => &[ActorRole::Physician, ActorRole::Admin],
        TransitionKind::Accept
        | TransitionKind::Start
        | TransitionKind::SaveResult
        | TransitionKind::SubmitResult => &[ActorRole::Worker, ActorRole::Admin],
        TransitionKind::Confirm => &[ActorRole::Physician, ActorRole::Admin],
        TransitionKind::Cancel => &[ActorRole::Physician, ActorRole::Worker, ActorRole::Admin],
    }
}

/// State the order must be in for this transition to be legal. `Cancel` is
/// special-cased (any non-terminal state).
fn required_state(kind: TransitionKind) -> Option<OrderState> {
    match kind {
        TransitionKind::Create => None,
        TransitionKind::Accept => Some(OrderState::Ordered),
        TransitionKind::Start => Some(OrderState::Accepted),
        TransitionKind::SaveResult | TransitionKind::SubmitResult => Some(OrderState::InProgress),
        TransitionKind::Confirm => Some(OrderState::ResultReady),
        TransitionKind::Cancel => None,
    }
}

/// Validate the precondition state for `kind` against the order's current
/// status.
pub fn check_state(order: &Order, kind: TransitionKind) -> Result<()> {
    match kind {
        TransitionKind::Cancel => {
            if order.status.is_terminal() {
                return Err(CoreError::illegal_transition(order.status, kind.to_string()));
            }
        }
        _ => {
            if let Some(required) = required_state(kind) {
                if order.status != required {
                    return Err(CoreError::illegal_transition(order.status, kind.to_string()));
                }
            }
        }
    }
    Ok(())
}

/// Validate the actor's role and ownership for `kind`.
pub fn check_actor(order: &Order, actor: &Actor, kind: TransitionKind) -> Result<()> {
    if !allowed_roles(kind).contains(&actor.role) {
        return Err(CoreError::forbidden(
            actor.to_string(),
            kind.to_string(),
            format!("role {} is not permitted to {kind}", actor.role),
        ));
    }

    match kind {
        // Worker-side transitions after acceptance belong to the assignee;
        // admins hold the override capability.
        TransitionKind::Start | TransitionKind::SaveResult | TransitionKind::SubmitResult => {
            if actor.role.can_override() {
                return Ok(());
            }
            match &order.assignee {
                Some(assignee) if assignee.id == actor.id => Ok(()),
                Some(assignee) => Err(CoreError::forbidden(
                    actor.to_string(),
                    kind.to_string(),
                    format!("order is assigned to {}", assignee.id),
                )),
                None => Err(CoreError::forbidden(
                    actor.to_string(),
                    kind.to_string(),
                    "order has no assignee".to_string(),
                )),
            }
        }
        // Confirmation and cancellation belong to the requester, with the
        // assignee also allowed to cancel work it has accepted.
        TransitionKind::Confirm => {
            if actor.role.can_override() || order.requester.id == actor.id {
                Ok(())
            } else {
                Err(CoreError::forbidden(
                    actor.to_string(),
                    kind.to_string(),
                    format!("order was requested by {}", order.requester.id),
                ))
            }
        }
        TransitionKind::Cancel => {
            let is_assignee = order
                .assignee
                .as_ref()
                .map(|a| a.id == actor.id)
                .unwrap_or(false);
            if actor.role.can_override() || order.requester.id == actor.id || is_assignee {
                Ok(())
            } else {
                Err(CoreError::forbidden(
                    actor.to_string(),
                    kind.to_string(),
                    "only the requester, the assignee or an admin may cancel".to_string(),
                ))
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::OrderPriority;
    use serde_json::json;

    fn order_in(status: OrderState) -> Order {
        let mut order = Order::new(
            1,
            Actor::physician("dr-kim"),
            "patient-1",
            "RIS",
            "MRI_BRAIN",
            OrderPriority::Normal,
            json!({}),
        );
        order.status = status;
        if status.rank().map(|r| r >= 1).unwrap_or(false) {
            order.assignee = Some(Actor::worker("tech-lee"));
        }
        order
    }

    #[test]
    fn accept_requires_ordered() {
        assert!(check_state(&order_in(OrderState::Ordered), TransitionKind::Accept).is_ok());
        let err =
            check_state(&order_in(OrderState::Accepted), TransitionKind::Accept).unwrap_err();
        assert!(matches!(err, CoreError::IllegalTransition { .. }));
    }

    #[test]
    fn cancel_rejected_from_terminal_states() {
        assert!(check_state(&order_in(OrderState::ResultReady), TransitionKind::Cancel).is_ok());
        assert!(check_state(&order_in(OrderState::Confirmed), TransitionKind::Cancel).is_err());
        assert!(check_state(&order_in(OrderState::Cancelled), TransitionKind::Cancel).is_err());
    }

    #[test]
    fn physician_cannot_accept() {
        let order = order_in(OrderState::Ordered);
        let err = check_actor(&order, &Actor::physician("dr-kim"), TransitionKind::Accept)
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { .. }));
    }

    #[test]
    fn start_requires_assignee_or_override() {
        let order = order_in(OrderState::Accepted);
        assert!(check_actor(&order, &Actor::worker("tech-lee"), TransitionKind::Start).is_ok());
        assert!(check_actor(&order, &Actor::worker("tech-park"), TransitionKind::Start).is_err());
        assert!(check_actor(&order, &Actor::admin("root"), TransitionKind::Start).is_ok());
    }

    #[test]
    fn confirm_belongs_to_the_requester() {
        let order = order_in(OrderState::ResultReady);
        assert!(check_actor(&order, &Actor::physician("dr-kim"), TransitionKind::Confirm).is_ok());
        assert!(
            check_actor(&order, &Actor::physician("dr-choi"), TransitionKind::Confirm).is_err()
        );
    }

    #[test]
    fn assignee_may_cancel_accepted_work() {
        let order = order_in(OrderState::InProgress);
        assert!(check_actor(&order, &Actor::worker("tech-lee"), TransitionKind::Cancel).is_ok());
        assert!(check_actor(&order, &Actor::worker("tech-park"), TransitionKind::Cancel).is_err());
    }
}
