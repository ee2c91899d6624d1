//! Role-Based Authorization
//!
//! Roles are named bundles of directory rights that grant administrative
//! actions. A principal satisfies a role on a target object when its
//! effective rights on that object include every right the role requires.
//!
//! ## Flow
//!
//! 1. [`RoleCatalog`] loads role definitions and flattens inheritance
//! 2. [`ActionIndex`] maps each action to the roles granting it
//! 3. [`DaclRoleManager`] computes effective rights through the directory and
//!    checks them against the candidate roles

pub mod action;
pub mod catalog;
pub mod index;
pub mod manager;

pub use action::ActionType;
pub use catalog::{CatalogOptions, InheritanceMode, Role, RoleCatalog, RoleDefinition};
pub use index::ActionIndex;
pub use manager::{DaclRoleManager, RoleManagerTrait};

/// A catalog and the index derived from it, replaced together on reload
#[derive(Debug, Clone, Default)]
pub struct RoleSet {
    pub catalog: RoleCatalog,
    pub index: ActionIndex,
}

impl RoleSet {
    pub fn build(definitions: &[RoleDefinition], options: CatalogOptions) -> crate::Result<Self> {
        let catalog = RoleCatalog::load(definitions, options)?;
        let index = ActionIndex::build(&catalog);
        Ok(Self { catalog, index })
    }
}
