//! Access Rules
//!
//! Defines the access-control entries carried by a directory object and the
//! request shape used to add, remove or set them through a directory store.

use super::{ControlType, DirectoryRights};
use crate::security::flags;
use crate::types::IdentityRef;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// How an entry propagates to child objects
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(try_from = "Vec<String>", into = "Vec<String>")]
    pub struct InheritanceFlags: u32 {
        const CONTAINER_INHERIT = 0x1;
        const OBJECT_INHERIT = 0x2;
    }
}

impl Default for InheritanceFlags {
    fn default() -> Self {
        InheritanceFlags::empty()
    }
}

impl TryFrom<Vec<String>> for InheritanceFlags {
    type Error = crate::error::AdAclError;

    fn try_from(tags: Vec<String>) -> Result<Self, Self::Error> {
        flags::parse_tags("inheritance flag", tags)
    }
}

impl From<InheritanceFlags> for Vec<String> {
    fn from(inheritance: InheritanceFlags) -> Self {
        flags::tag_names(&inheritance)
    }
}

/// Inheritance requested when writing a new entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SecurityInheritance {
    /// Applies to the object only
    #[default]
    None,
    /// Object and all descendants
    All,
    /// Descendants only
    Descendents,
    /// Object and immediate children
    SelfAndChildren,
    /// Immediate children only
    Children,
}

impl SecurityInheritance {
    /// Flags stamped on the entry for this inheritance type
    pub fn inheritance_flags(&self) -> InheritanceFlags {
        match self {
            SecurityInheritance::None => InheritanceFlags::empty(),
            SecurityInheritance::All
            | SecurityInheritance::Descendents
            | SecurityInheritance::SelfAndChildren
            | SecurityInheritance::Children => InheritanceFlags::CONTAINER_INHERIT,
        }
    }
}

/// One access-control entry on a directory object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRuleEntry {
    /// Allow or Deny
    pub control_type: ControlType,

    /// Rights carried by this entry
    pub rights: DirectoryRights,

    /// Security identifier of the trustee
    pub identity_reference: IdentityRef,

    /// Display name of the trustee, filled in when the store resolves it
    #[serde(default)]
    pub identity_name: Option<String>,

    #[serde(default)]
    pub inheritance_flags: InheritanceFlags,

    /// Inherited from a parent container rather than set explicitly
    #[serde(default)]
    pub is_inherited: bool,
}

impl AccessRuleEntry {
    /// Create an explicit, non-inheritable entry
    pub fn new(
        identity_reference: impl Into<IdentityRef>,
        rights: DirectoryRights,
        control_type: ControlType,
    ) -> Self {
        Self {
            control_type,
            rights,
            identity_reference: identity_reference.into(),
            identity_name: None,
            inheritance_flags: InheritanceFlags::empty(),
            is_inherited: false,
        }
    }

    /// Shorthand for an Allow entry
    pub fn allow(identity_reference: impl Into<IdentityRef>, rights: DirectoryRights) -> Self {
        Self::new(identity_reference, rights, ControlType::Allow)
    }

    /// Shorthand for a Deny entry
    pub fn deny(identity_reference: impl Into<IdentityRef>, rights: DirectoryRights) -> Self {
        Self::new(identity_reference, rights, ControlType::Deny)
    }

    pub fn with_identity_name(mut self, name: impl Into<String>) -> Self {
        self.identity_name = Some(name.into());
        self
    }

    pub fn with_inheritance_flags(mut self, flags: InheritanceFlags) -> Self {
        self.inheritance_flags = flags;
        self
    }

    /// Mark this entry as inherited from a parent container
    pub fn inherited(mut self) -> Self {
        self.is_inherited = true;
        self
    }

    /// Check if this entry belongs to the given trustee. Security
    /// identifiers compare without regard to ASCII case.
    pub fn applies_to(&self, identity: &str) -> bool {
        self.identity_reference.eq_ignore_ascii_case(identity)
    }

    /// Check if this entry was created by writing `spec`
    pub fn matches_spec(&self, spec: &AccessRuleSpec) -> bool {
        !self.is_inherited
            && self.applies_to(&spec.principal)
            && self.control_type == spec.control_type
            && self.inheritance_flags == spec.inheritance.inheritance_flags()
    }
}

impl fmt::Display for AccessRuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trustee = self
            .identity_name
            .as_deref()
            .unwrap_or(&*self.identity_reference);
        write!(f, "{} [{}] for [{}]", self.control_type, self.rights, trustee)?;
        if self.is_inherited {
            f.write_str(" (inherited)")?;
        }
        Ok(())
    }
}

/// Entry to write through a directory store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRuleSpec {
    /// Trustee security identifier
    pub principal: IdentityRef,
    pub rights: DirectoryRights,
    pub control_type: ControlType,
    #[serde(default)]
    pub inheritance: SecurityInheritance,
}

impl AccessRuleSpec {
    pub fn new(principal: IdentityRef, rights: DirectoryRights, control_type: ControlType) -> Self {
        Self {
            principal,
            rights,
            control_type,
            inheritance: SecurityInheritance::None,
        }
    }

    pub fn with_inheritance(mut self, inheritance: SecurityInheritance) -> Self {
        self.inheritance = inheritance;
        self
    }

    /// The explicit entry this spec produces when added
    pub fn to_entry(&self) -> AccessRuleEntry {
        AccessRuleEntry::new(self.principal.clone(), self.rights, self.control_type)
            .with_inheritance_flags(self.inheritance.inheritance_flags())
    }
}
