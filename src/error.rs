use std::collections::BTreeMap;

use crate::state_machine::states::{JobState, OrderState};

/// Crate-wide error taxonomy.
///
/// Rejections carry enough detail for the caller to correct the request:
/// illegal transitions name the current and attempted states, `InputNotReady`
/// enumerates the missing dotted keys per source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Illegal transition: {attempted} not allowed from {from}")]
    IllegalTransition { from: OrderState, attempted: String },

    #[error("Illegal job transition: {attempted} not allowed from {from}")]
    IllegalJobTransition { from: JobState, attempted: String },

    #[error("Forbidden: actor {actor} may not {action}: {reason}")]
    Forbidden {
        actor: String,
        action: String,
        reason: String,
    },

    #[error("Input not ready: missing required keys {missing:?}")]
    InputNotReady {
        /// Source category -> unresolved dotted keys.
        missing: BTreeMap<String, Vec<String>>,
    },

    #[error("Upstream fetch failed for {category}: {detail}")]
    UpstreamFetchFailed { category: String, detail: String },

    #[error("Callback delivery failed: {0}")]
    CallbackDeliveryFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(
        actor: impl Into<String>,
        action: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Forbidden {
            actor: actor.into(),
            action: action.into(),
            reason: reason.into(),
        }
    }

    pub fn illegal_transition(from: OrderState, attempted: impl Into<String>) -> Self {
        Self::IllegalTransition {
            from,
            attempted: attempted.into(),
        }
    }

    pub fn illegal_job_transition(from: JobState, attempted: impl Into<String>) -> Self {
        Self::IllegalJobTransition {
            from,
            attempted: attempted.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
