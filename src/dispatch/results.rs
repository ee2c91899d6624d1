use crate::error::AdAclError;
use crate::security::acl::AccessRuleEntry;
use crate::security::roles::ActionType;
use crate::types::ObjectKind;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome category of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusType {
    Success,
    NotAllowed,
    DoesNotExist,
    NotSupported,
    DirectoryUnavailable,
    Failure,
}

impl From<&AdAclError> for StatusType {
    fn from(error: &AdAclError) -> Self {
        match error {
            AdAclError::NotAllowed { .. } => StatusType::NotAllowed,
            AdAclError::NotFound(_) | AdAclError::RoleNotFound(_) => StatusType::DoesNotExist,
            AdAclError::NotSupported(_) => StatusType::NotSupported,
            AdAclError::DirectoryUnavailable(_) => StatusType::DirectoryUnavailable,
            _ => StatusType::Failure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStatus {
    pub action: String,
    pub status: StatusType,
    pub message: String,
}

/// Everything that happened to one batch object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectResult {
    pub kind: ObjectKind,
    pub identity: String,
    pub statuses: Vec<ActionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_rules: Option<Vec<AccessRuleEntry>>,
}

impl ObjectResult {
    pub fn new(kind: ObjectKind, identity: impl Into<String>) -> Self {
        Self {
            kind,
            identity: identity.into(),
            statuses: Vec::new(),
            access_rules: None,
        }
    }

    pub fn push_success(&mut self, action: ActionType, message: impl Into<String>) {
        self.statuses.push(ActionStatus {
            action: action.to_string(),
            status: StatusType::Success,
            message: message.into(),
        });
    }

    pub fn push_error(&mut self, action: ActionType, error: &AdAclError) {
        self.statuses.push(ActionStatus {
            action: action.to_string(),
            status: StatusType::from(error),
            message: error.to_string(),
        });
    }

    /// True when at least one operation was recorded and all of them
    /// succeeded
    pub fn is_success(&self) -> bool {
        !self.statuses.is_empty()
            && self
                .statuses
                .iter()
                .all(|status| status.status == StatusType::Success)
    }

    /// Status of the last recorded operation
    pub fn last_status(&self) -> Option<StatusType> {
        self.statuses.last().map(|status| status.status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    pub batch_id: Uuid,
    pub action: String,
    pub results: Vec<ObjectResult>,
}

impl BatchResults {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}
