//! Control Type and Authorization Decision Types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an access-control entry grants or refuses its rights
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ControlType {
    /// Grant the rights
    #[default]
    Allow,

    /// Refuse the rights
    Deny,
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlType::Allow => f.write_str("Allow"),
            ControlType::Deny => f.write_str("Deny"),
        }
    }
}

/// Outcome of evaluating an action against the role catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    /// Granted through the named role
    Allow { role: String },

    /// Candidate roles exist but none is satisfied by the effective rights
    Deny { reason: String },

    /// No role grants the action
    NoMatch,
}

impl AuthorizationDecision {
    /// Check if the decision allows the action
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allow { .. })
    }

    /// Role that granted the action, if any
    pub fn granting_role(&self) -> Option<&str> {
        match self {
            AuthorizationDecision::Allow { role } => Some(role),
            _ => None,
        }
    }

    /// Get the denial reason if this is a deny decision
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            AuthorizationDecision::Deny { reason } => Some(reason),
            AuthorizationDecision::NoMatch => Some("No role grants this action"),
            AuthorizationDecision::Allow { .. } => None,
        }
    }
}
