use crate::error::Result;
use crate::security::acl::{AccessRuleEntry, AccessRuleSpec};
use crate::types::{IdentityRef, PrincipalIdentity};

use async_trait::async_trait;
use std::collections::HashSet;

/// Directory operations the authorization engine depends on.
///
/// Identities may be given as a security identifier, account name,
/// distinguished name or alias. Every mutation commits immediately.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Resolve a user or group. Fails with `NotFound` when nothing matches and
    /// `Ambiguous` when more than one principal does.
    async fn resolve_principal(&self, identity: &str) -> Result<PrincipalIdentity>;

    /// Security identifiers of every group `sid` belongs to, directly or
    /// through nested groups. The principal's own identifier is not included.
    async fn get_group_closure(&self, sid: &str) -> Result<HashSet<IdentityRef>>;

    /// Access-control entries on `target`, explicit and inherited
    async fn get_access_rules(&self, target: &str) -> Result<Vec<AccessRuleEntry>>;

    /// Append an explicit entry
    async fn add_access_rule(&self, target: &str, spec: &AccessRuleSpec) -> Result<()>;

    /// Strip the requested rights from matching explicit entries, dropping
    /// entries left empty. Matching nothing is a no-op.
    async fn remove_access_rule(&self, target: &str, spec: &AccessRuleSpec) -> Result<()>;

    /// Replace every explicit entry with the same trustee and control type
    async fn set_access_rule(&self, target: &str, spec: &AccessRuleSpec) -> Result<()>;

    /// Remove every explicit entry for `sid`
    async fn purge_access_rules(&self, target: &str, sid: &str) -> Result<()>;
}
