// Order and job state management.
//
// Order transitions run under a per-order exclusive lock with guard checks,
// append-only history and write-then-notify event emission.

pub mod events;
pub mod guards;
pub mod order_state_machine;
pub mod states;

pub use events::TransitionKind;
pub use order_state_machine::{CreateOrderRequest, OrderStateMachine};
pub use states::{JobState, OrderState};
