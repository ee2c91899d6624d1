use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable identity key of a principal (security identifier string).
pub type IdentityRef = Arc<str>;

/// Kinds of directory objects the engine can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    User,
    Group,
    OrganizationalUnit,
}

impl ObjectKind {
    /// Users and groups are security principals; OUs are containers only.
    pub fn is_principal(&self) -> bool {
        match self {
            ObjectKind::User | ObjectKind::Group => true,
            ObjectKind::OrganizationalUnit => false,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::User => "User",
            ObjectKind::Group => "Group",
            ObjectKind::OrganizationalUnit => "OrganizationalUnit",
        };
        f.write_str(name)
    }
}

/// A principal as resolved by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalIdentity {
    pub sid: IdentityRef,
    pub name: String,
    pub kind: ObjectKind,
}

impl fmt::Display for PrincipalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.sid)
    }
}
