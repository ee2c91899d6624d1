use crate::security::acl::{ControlType, DirectoryRights, SecurityInheritance};
use crate::security::roles::ActionType;
use crate::types::ObjectKind;

use serde::{Deserialize, Serialize};

/// Access rule to add, remove, set or purge on a batch object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRuleRequest {
    /// Trustee, by any identity the directory resolves
    pub identity: String,
    #[serde(default)]
    pub rights: DirectoryRights,
    #[serde(default)]
    pub control_type: ControlType,
    #[serde(default)]
    pub inheritance: SecurityInheritance,
}

impl AccessRuleRequest {
    pub fn allow(identity: impl Into<String>, rights: DirectoryRights) -> Self {
        Self {
            identity: identity.into(),
            rights,
            control_type: ControlType::Allow,
            inheritance: SecurityInheritance::None,
        }
    }

    pub fn deny(identity: impl Into<String>, rights: DirectoryRights) -> Self {
        Self {
            control_type: ControlType::Deny,
            ..Self::allow(identity, rights)
        }
    }
}

/// Role to grant or revoke on a batch object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRequest {
    pub principal: String,
    pub name: String,
}

impl RoleRequest {
    pub fn new(principal: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            name: name.into(),
        }
    }
}

/// One directory object addressed by a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdObject {
    pub kind: ObjectKind,
    pub identity: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_rules: Vec<AccessRuleRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RoleRequest>,
}

impl AdObject {
    pub fn new(kind: ObjectKind, identity: impl Into<String>) -> Self {
        Self {
            kind,
            identity: identity.into(),
            access_rules: Vec::new(),
            roles: Vec::new(),
        }
    }

    pub fn with_access_rule(mut self, rule: AccessRuleRequest) -> Self {
        self.access_rules.push(rule);
        self
    }

    pub fn with_role(mut self, role: RoleRequest) -> Self {
        self.roles.push(role);
        self
    }
}

/// A single action applied to a list of objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(with = "single_action")]
    pub action: ActionType,
    #[serde(default)]
    pub objects: Vec<AdObject>,
}

impl BatchRequest {
    pub fn new(action: ActionType) -> Self {
        Self {
            action,
            objects: Vec::new(),
        }
    }

    pub fn with_object(mut self, object: AdObject) -> Self {
        self.objects.push(object);
        self
    }
}

// Requests name one action as a plain string, e.g. "AddAccessRule".
mod single_action {
    use crate::security::roles::ActionType;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(action: &ActionType, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&action.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ActionType, D::Error> {
        let tag = String::deserialize(deserializer)?;
        ActionType::from_tag(&tag).map_err(D::Error::custom)
    }
}
