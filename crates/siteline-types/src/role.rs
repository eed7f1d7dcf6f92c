use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Coarse authorization role attached to every authenticated request.
///
/// Authentication happens upstream; the core trusts the role it is
/// handed and uses it only for routing and operator-only operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Field worker: starts and ends their own shifts, syncs devices.
    Worker,
    /// Supervisor: receives realtime activity for all workers.
    Supervisor,
    /// Operator: back-office; resolves conflicts and manages assignments.
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Supervisor => "supervisor",
            Self::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worker" => Ok(Self::Worker),
            "supervisor" => Ok(Self::Supervisor),
            "operator" => Ok(Self::Operator),
            other => Err(TypeError::UnknownRole(other.to_string())),
        }
    }
}
