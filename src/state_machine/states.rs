use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle states.
///
/// `ORDERED → ACCEPTED → IN_PROGRESS → RESULT_READY → CONFIRMED`, with
/// `CANCELLED` reachable from any non-terminal state. `CONFIRMED` and
/// `CANCELLED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Initial state when the order is created by the requester.
    Ordered,
    /// A worker has accepted the order; assignee is set.
    Accepted,
    /// The assignee has started the work.
    InProgress,
    /// A non-empty result payload has been submitted.
    ResultReady,
    /// The requester confirmed correctness; result payload is frozen.
    Confirmed,
    /// Terminal cancellation with a recorded reason.
    Cancelled,
}

impl OrderState {
    /// Check if this is a terminal state (no further transitions allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled)
    }

    /// Position along the forward progression, for the monotonicity
    /// invariant. `Cancelled` sits outside the chain.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Ordered => Some(0),
            Self::Accepted => Some(1),
            Self::InProgress => Some(2),
            Self::ResultReady => Some(3),
            Self::Confirmed => Some(4),
            Self::Cancelled => None,
        }
    }
}

impl Default for OrderState {
    fn default() -> Self {
        Self::Ordered
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordered => write!(f, "ordered"),
            Self::Accepted => write!(f, "accepted"),
            Self::InProgress => write!(f, "in_progress"),
            Self::ResultReady => write!(f, "result_ready"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordered" => Ok(Self::Ordered),
            "accepted" => Ok(Self::Accepted),
            "in_progress" => Ok(Self::InProgress),
            "result_ready" => Ok(Self::ResultReady),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid order state: {s}")),
        }
    }
}

/// Inference job lifecycle states.
///
/// `PENDING → PROCESSING → {COMPLETED, FAILED, TIMED_OUT, CANCELLED}`.
/// `TIMED_OUT` is the watchdog's terminal state, kept distinct from `FAILED`
/// so an explicit worker error and a vanished pipeline stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    /// Check if this is a terminal state. Terminal jobs accept further
    /// callbacks but discard them (first terminal callback wins).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "timed_out" => Ok(Self::TimedOut),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid job state: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_terminal_check() {
        assert!(OrderState::Confirmed.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(!OrderState::Ordered.is_terminal());
        assert!(!OrderState::ResultReady.is_terminal());
    }

    #[test]
    fn order_rank_is_strictly_increasing_along_the_chain() {
        let chain = [
            OrderState::Ordered,
            OrderState::Accepted,
            OrderState::InProgress,
            OrderState::ResultReady,
            OrderState::Confirmed,
        ];
        for pair in chain.windows(2) {
            assert!(pair[0].rank().unwrap() < pair[1].rank().unwrap());
        }
        assert!(OrderState::Cancelled.rank().is_none());
    }

    #[test]
    fn job_terminal_check() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::TimedOut.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Processing.is_terminal());
    }

    #[test]
    fn state_string_conversion() {
        assert_eq!(OrderState::ResultReady.to_string(), "result_ready");
        assert_eq!(
            "in_progress".parse::<OrderState>().unwrap(),
            OrderState::InProgress
        );
        assert_eq!(JobState::TimedOut.to_string(), "timed_out");
        assert_eq!("processing".parse::<JobState>().unwrap(), JobState::Processing);
    }

    #[test]
    fn state_serde() {
        let json = serde_json::to_string(&OrderState::ResultReady).unwrap();
        assert_eq!(json, "\"result_ready\"");
        let parsed: OrderState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, OrderState::ResultReady);
    }
}
