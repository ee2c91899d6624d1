//! Role Catalog
//!
//! Loads named role definitions, validates them and flattens role inheritance
//! into an immutable, ordered catalog. Only allowed actions are inherited; the
//! directory rights a role requires are always the ones it declares.

use super::ActionType;
use crate::error::{AdAclError, Result};
use crate::security::acl::DirectoryRights;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A role as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,

    #[serde(default)]
    pub allowed_actions: ActionType,

    /// Rights a principal must hold on the target to satisfy this role
    #[serde(default)]
    pub directory_rights: DirectoryRights,

    /// Parent roles whose actions this role inherits, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends_roles: Vec<String>,
}

impl RoleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_actions: ActionType::empty(),
            directory_rights: DirectoryRights::empty(),
            extends_roles: Vec::new(),
        }
    }

    pub fn with_actions(mut self, actions: ActionType) -> Self {
        self.allowed_actions = actions;
        self
    }

    pub fn with_rights(mut self, rights: DirectoryRights) -> Self {
        self.directory_rights = rights;
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends_roles.push(parent.into());
        self
    }
}

/// How parent actions propagate to child roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceMode {
    /// Children receive their parents' flattened actions, so grandparents
    /// propagate
    #[default]
    Transitive,

    /// Children receive only the actions their parents declare themselves
    Direct,
}

/// Options controlling how a catalog is built
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CatalogOptions {
    #[serde(default)]
    pub inheritance: InheritanceMode,

    /// Fail the load when a role extends a role that does not exist
    #[serde(default)]
    pub strict_parent_references: bool,
}

/// A loaded role with its inheritance flattened
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub name: String,

    /// Declared actions plus everything inherited from parent roles
    pub allowed_actions: ActionType,

    /// Actions as configured, before inheritance
    pub declared_actions: ActionType,

    pub directory_rights: DirectoryRights,

    pub extends_roles: Vec<String>,
}

impl Role {
    /// Check if this role grants `action`
    pub fn grants(&self, action: ActionType) -> bool {
        !action.is_empty() && self.allowed_actions.contains(action)
    }

    /// Check if `effective` rights satisfy this role
    pub fn is_satisfied_by(&self, effective: DirectoryRights) -> bool {
        effective.satisfies(self.directory_rights)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Immutable, ordered mapping of role name to role
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: IndexMap<String, Role>,
    options: CatalogOptions,
}

impl RoleCatalog {
    /// Validate `definitions` and flatten their inheritance.
    ///
    /// The resulting iteration order is the order of `definitions`.
    pub fn load(definitions: &[RoleDefinition], options: CatalogOptions) -> Result<Self> {
        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(definitions.len());
        for (position, definition) in definitions.iter().enumerate() {
            if definition.name.trim().is_empty() {
                return Err(AdAclError::InvalidConfig(format!(
                    "role_manager.roles[{}].name must not be empty",
                    position
                )));
            }
            if positions.insert(definition.name.as_str(), position).is_some() {
                return Err(AdAclError::DuplicateRole(definition.name.clone()));
            }
        }

        let parents = Self::resolve_parents(definitions, &positions, options)?;
        Self::detect_cycles(definitions, &parents)?;

        let declared: Vec<ActionType> = definitions.iter().map(|d| d.allowed_actions).collect();
        let flattened = match options.inheritance {
            InheritanceMode::Direct => parents
                .iter()
                .enumerate()
                .map(|(node, node_parents)| {
                    node_parents
                        .iter()
                        .fold(declared[node], |actions, &parent| actions | declared[parent])
                })
                .collect::<Vec<_>>(),
            InheritanceMode::Transitive => {
                let mut memo = vec![None; definitions.len()];
                (0..definitions.len())
                    .map(|node| Self::flatten(node, &parents, &declared, &mut memo))
                    .collect::<Vec<_>>()
            }
        };

        let mut roles = IndexMap::with_capacity(definitions.len());
        for ((definition, allowed_actions), declared_actions) in
            definitions.iter().zip(flattened).zip(declared)
        {
            debug!(
                role = %definition.name,
                actions = %allowed_actions,
                rights = %definition.directory_rights,
                "Loaded role"
            );
            roles.insert(
                definition.name.clone(),
                Role {
                    name: definition.name.clone(),
                    allowed_actions,
                    declared_actions,
                    directory_rights: definition.directory_rights,
                    extends_roles: definition.extends_roles.clone(),
                },
            );
        }

        Ok(Self { roles, options })
    }

    fn resolve_parents(
        definitions: &[RoleDefinition],
        positions: &HashMap<&str, usize>,
        options: CatalogOptions,
    ) -> Result<Vec<Vec<usize>>> {
        let mut parents = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let mut resolved = Vec::with_capacity(definition.extends_roles.len());
            for parent in &definition.extends_roles {
                match positions.get(parent.as_str()) {
                    Some(&position) => {
                        if !resolved.contains(&position) {
                            resolved.push(position);
                        }
                    }
                    None if options.strict_parent_references => {
                        return Err(AdAclError::UnknownParentRole {
                            role: definition.name.clone(),
                            parent: parent.clone(),
                        });
                    }
                    None => {
                        warn!(
                            role = %definition.name,
                            parent = %parent,
                            "Ignoring reference to unknown parent role"
                        );
                    }
                }
            }
            parents.push(resolved);
        }
        Ok(parents)
    }

    fn detect_cycles(definitions: &[RoleDefinition], parents: &[Vec<usize>]) -> Result<()> {
        let mut marks = vec![Mark::Unvisited; definitions.len()];
        let mut path = Vec::new();
        for node in 0..definitions.len() {
            Self::visit(node, definitions, parents, &mut marks, &mut path)?;
        }
        Ok(())
    }

    fn visit(
        node: usize,
        definitions: &[RoleDefinition],
        parents: &[Vec<usize>],
        marks: &mut [Mark],
        path: &mut Vec<usize>,
    ) -> Result<()> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = path.iter().position(|&n| n == node).unwrap_or(0);
                let cycle: Vec<&str> = path[start..]
                    .iter()
                    .chain(std::iter::once(&node))
                    .map(|&n| definitions[n].name.as_str())
                    .collect();
                return Err(AdAclError::CyclicInheritance(cycle.join(" -> ")));
            }
            Mark::Unvisited => {}
        }

        marks[node] = Mark::InProgress;
        path.push(node);
        for &parent in &parents[node] {
            Self::visit(parent, definitions, parents, marks, path)?;
        }
        path.pop();
        marks[node] = Mark::Done;
        Ok(())
    }

    // Callers must have rejected cycles already.
    fn flatten(
        node: usize,
        parents: &[Vec<usize>],
        declared: &[ActionType],
        memo: &mut [Option<ActionType>],
    ) -> ActionType {
        if let Some(actions) = memo[node] {
            return actions;
        }
        let mut actions = declared[node];
        for &parent in &parents[node] {
            actions |= Self::flatten(parent, parents, declared, memo);
        }
        memo[node] = Some(actions);
        actions
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    /// Look up a role, failing with `RoleNotFound`
    pub fn require(&self, name: &str) -> Result<&Role> {
        self.get(name)
            .ok_or_else(|| AdAclError::RoleNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// Role names in configuration order
    pub fn names(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn options(&self) -> CatalogOptions {
        self.options
    }
}
