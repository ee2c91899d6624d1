//! Action Index
//!
//! Derived lookup from each single action to the roles granting it, in
//! catalog order.

use super::{ActionType, RoleCatalog};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ActionIndex {
    entries: HashMap<ActionType, Vec<String>>,
}

impl ActionIndex {
    /// Build the index from a loaded catalog. Every single action gets an
    /// entry, empty when no role grants it.
    pub fn build(catalog: &RoleCatalog) -> Self {
        let entries = ActionType::each()
            .map(|action| {
                let roles = catalog
                    .iter()
                    .filter(|role| role.grants(action))
                    .map(|role| role.name.clone())
                    .collect();
                (action, roles)
            })
            .collect();

        Self { entries }
    }

    /// Roles granting `action`, or `None` for `All`, `None` and combined
    /// actions
    pub fn roles_for(&self, action: ActionType) -> Option<&[String]> {
        self.entries.get(&action).map(Vec::as_slice)
    }

    /// Actions at least one role grants
    pub fn granted_actions(&self) -> ActionType {
        self.entries
            .iter()
            .filter(|(_, roles)| !roles.is_empty())
            .fold(ActionType::empty(), |acc, (action, _)| acc | *action)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
