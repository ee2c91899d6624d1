//! Administrative Actions
//!
//! Every request the engine authorizes names exactly one action. Roles carry a
//! bitmask of the actions they grant; the `All` and `None` tags are
//! configuration shorthands for every action and no action.

use crate::error::Result;
use crate::security::flags;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Actions a role may grant
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(try_from = "Vec<String>", into = "Vec<String>")]
    pub struct ActionType: u32 {
        const GET = 1 << 0;
        const CREATE = 1 << 1;
        const MODIFY = 1 << 2;
        const DELETE = 1 << 3;
        const ADD_TO_GROUP = 1 << 4;
        const REMOVE_FROM_GROUP = 1 << 5;
        const ADD_ACCESS_RULE = 1 << 6;
        const REMOVE_ACCESS_RULE = 1 << 7;
        const SET_ACCESS_RULE = 1 << 8;
        const PURGE_ACCESS_RULES = 1 << 9;
        const ADD_ROLE = 1 << 10;
        const REMOVE_ROLE = 1 << 11;
        const SEARCH = 1 << 12;
    }
}

impl ActionType {
    /// Parse a single action tag, accepting the `All` and `None` sentinels
    pub fn from_tag(tag: &str) -> Result<Self> {
        let trimmed = tag.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(ActionType::all());
        }
        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(ActionType::empty());
        }
        flags::parse_tag("action", trimmed)
    }

    pub fn from_tags<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut actions = ActionType::empty();
        for tag in tags {
            actions |= ActionType::from_tag(tag.as_ref())?;
        }
        Ok(actions)
    }

    /// True for exactly one named action, false for `All`, `None` and
    /// combinations
    pub fn is_single(&self) -> bool {
        self.bits().count_ones() == 1
    }

    /// The single actions contained in this mask, in declaration order
    pub fn actions(&self) -> impl Iterator<Item = ActionType> + '_ {
        self.iter()
    }

    /// Every single action
    pub fn each() -> impl Iterator<Item = ActionType> {
        ActionType::all().iter()
    }

    pub fn tags(&self) -> Vec<String> {
        flags::tag_names(self)
    }
}

impl Default for ActionType {
    fn default() -> Self {
        ActionType::empty()
    }
}

impl TryFrom<Vec<String>> for ActionType {
    type Error = crate::error::AdAclError;

    fn try_from(tags: Vec<String>) -> std::result::Result<Self, Self::Error> {
        ActionType::from_tags(tags)
    }
}

impl From<ActionType> for Vec<String> {
    fn from(actions: ActionType) -> Self {
        actions.tags()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("None")
        } else if *self == ActionType::all() {
            f.write_str("All")
        } else {
            f.write_str(&self.tags().join(", "))
        }
    }
}
