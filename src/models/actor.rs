use std::fmt;

use serde::{Deserialize, Serialize};

/// Role held by an actor performing order or job operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Ordering physician; creates, confirms and cancels own orders.
    Physician,
    /// Department worker (radiology/lab); accepts and executes orders.
    Worker,
    /// Administrator; may override ownership checks.
    Admin,
}

impl ActorRole {
    /// Admins may act on orders they neither requested nor accepted.
    pub fn can_override(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Physician => write!(f, "physician"),
            Self::Worker => write!(f, "worker"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "physician" => Ok(Self::Physician),
            "worker" => Ok(Self::Worker),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Invalid actor role: {s}")),
        }
    }
}

/// Identity and role of the caller of a state-changing operation.
///
/// Authentication is out of scope; the API trusts the supplied context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self { id: id.into(), role }
    }

    pub fn physician(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Physician)
    }

    pub fn worker(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Worker)
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, ActorRole::Admin)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.id, self.role)
    }
}
