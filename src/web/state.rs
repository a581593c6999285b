//! Shared application state for the web boundary.

use std::sync::Arc;

use crate::orchestration::InferenceJobOrchestrator;
use crate::state_machine::OrderStateMachine;

#[derive(Clone)]
pub struct AppState {
    pub state_machine: Arc<OrderStateMachine>,
    pub orchestrator: Arc<InferenceJobOrchestrator>,
}

impl AppState {
    pub fn new(
        state_machine: Arc<OrderStateMachine>,
        orchestrator: Arc<InferenceJobOrchestrator>,
    ) -> Self {
        Self {
            state_machine,
            orchestrator,
        }
    }
}
