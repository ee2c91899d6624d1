//! Directory Rights
//!
//! Bitmask over the Active Directory object rights. Composite rights are
//! declared before the single rights so that rendering prefers them.

use crate::security::flags;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Rights an access-control entry grants on a directory object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(try_from = "Vec<String>", into = "Vec<String>")]
    pub struct DirectoryRights: u32 {
        const GENERIC_ALL = 0x000F_01FF;
        const GENERIC_READ = 0x0002_0094;
        const GENERIC_WRITE = 0x0002_0028;
        const GENERIC_EXECUTE = 0x0002_0004;

        const CREATE_CHILD = 0x0000_0001;
        const DELETE_CHILD = 0x0000_0002;
        const LIST_CHILDREN = 0x0000_0004;
        const SELF = 0x0000_0008;
        const READ_PROPERTY = 0x0000_0010;
        const WRITE_PROPERTY = 0x0000_0020;
        const DELETE_TREE = 0x0000_0040;
        const LIST_OBJECT = 0x0000_0080;
        const EXTENDED_RIGHT = 0x0000_0100;
        const DELETE = 0x0001_0000;
        const READ_CONTROL = 0x0002_0000;
        const WRITE_DACL = 0x0004_0000;
        const WRITE_OWNER = 0x0008_0000;
        const SYNCHRONIZE = 0x0010_0000;
        const ACCESS_SYSTEM_SECURITY = 0x0100_0000;
    }
}

impl DirectoryRights {
    /// Parse rights tags such as `["GenericRead", "WriteProperty"]`
    pub fn from_tags<I, S>(tags: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        flags::parse_tags("directory right", tags)
    }

    /// Tag names for these rights
    pub fn tags(&self) -> Vec<String> {
        flags::tag_names(self)
    }

    /// True when every right in `required` is present in `self`
    pub fn satisfies(&self, required: DirectoryRights) -> bool {
        (*self & required) == required
    }
}

impl Default for DirectoryRights {
    fn default() -> Self {
        DirectoryRights::empty()
    }
}

impl TryFrom<Vec<String>> for DirectoryRights {
    type Error = crate::error::AdAclError;

    fn try_from(tags: Vec<String>) -> Result<Self, Self::Error> {
        DirectoryRights::from_tags(tags)
    }
}

impl From<DirectoryRights> for Vec<String> {
    fn from(rights: DirectoryRights) -> Self {
        rights.tags()
    }
}

impl fmt::Display for DirectoryRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        f.write_str(&self.tags().join(", "))
    }
}
