//! Authorization Engine
//!
//! Decides whether a principal may perform an administrative action on a
//! directory object.
//!
//! ## Key Components
//!
//! - **Access control**: rights bitmasks, access-control entries and the
//!   aggregation of those entries into effective rights
//! - **Roles**: the role catalog, the action index and the role manager that
//!   acts as the authorization gate
//! - **Audit**: a bounded trail of decisions and role changes

pub mod acl;
pub mod audit;
pub mod flags;
pub mod roles;

#[cfg(test)]
pub mod tests;

pub use acl::{
    AccessRuleEntry, AccessRuleSpec, AuthorizationDecision, ControlType, DenyEvaluation,
    DirectoryRights, RightsAggregator,
};
pub use audit::{AuditEvent, AuditLogger};
pub use roles::{ActionType, DaclRoleManager, RoleCatalog, RoleDefinition, RoleManagerTrait};
