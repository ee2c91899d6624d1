//! In-Memory Directory Store
//!
//! Holds users, groups and organizational units with their memberships and
//! access-control entries. Loaded from and saved to a JSON snapshot. The
//! access-rule mutations follow directory object-security semantics: explicit
//! entries are edited, inherited entries are left alone.

use super::DirectoryStore;
use crate::error::{AdAclError, Result};
use crate::security::acl::{AccessRuleEntry, AccessRuleSpec};
use crate::types::{IdentityRef, ObjectKind, PrincipalIdentity};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock as AsyncRwLock;
use tracing::{debug, info};

/// One directory object as stored in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntryRecord {
    /// Required for users and groups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub name: String,
    pub distinguished_name: String,
    pub kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Groups this object is a direct member of, by any identity
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub member_of: Vec<String>,
    #[serde(default)]
    pub access_rules: Vec<AccessRuleEntry>,
}

impl DirectoryEntryRecord {
    fn new(sid: Option<String>, name: &str, distinguished_name: &str, kind: ObjectKind) -> Self {
        Self {
            sid,
            name: name.to_string(),
            distinguished_name: distinguished_name.to_string(),
            kind,
            aliases: Vec::new(),
            member_of: Vec::new(),
            access_rules: Vec::new(),
        }
    }

    pub fn user(sid: &str, name: &str, distinguished_name: &str) -> Self {
        Self::new(Some(sid.to_string()), name, distinguished_name, ObjectKind::User)
    }

    pub fn group(sid: &str, name: &str, distinguished_name: &str) -> Self {
        Self::new(Some(sid.to_string()), name, distinguished_name, ObjectKind::Group)
    }

    pub fn organizational_unit(name: &str, distinguished_name: &str) -> Self {
        Self::new(None, name, distinguished_name, ObjectKind::OrganizationalUnit)
    }

    pub fn member_of(mut self, group: impl Into<String>) -> Self {
        self.member_of.push(group.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_rule(mut self, rule: AccessRuleEntry) -> Self {
        self.access_rules.push(rule);
        self
    }

    fn has_sid(&self, sid: &str) -> bool {
        self.sid
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(sid))
    }

    fn matches(&self, identity: &str) -> bool {
        self.has_sid(identity)
            || self.name.eq_ignore_ascii_case(identity)
            || self.distinguished_name.eq_ignore_ascii_case(identity)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(identity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub entries: Vec<DirectoryEntryRecord>,
}

impl DirectorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, entry: DirectoryEntryRecord) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Default)]
struct DirectoryState {
    entries: Vec<DirectoryEntryRecord>,
    /// Resolved `member_of` of each entry, as entry positions
    memberships: Vec<Vec<usize>>,
}

impl DirectoryState {
    fn build(snapshot: DirectorySnapshot) -> Result<Self> {
        let mut state = Self {
            entries: snapshot.entries,
            memberships: Vec::new(),
        };

        let mut sids = HashSet::new();
        for entry in &state.entries {
            match (&entry.sid, entry.kind.is_principal()) {
                (None, true) => {
                    return Err(AdAclError::InvalidConfig(format!(
                        "directory entry [{}] is a {} without a sid",
                        entry.name, entry.kind
                    )));
                }
                (Some(sid), _) => {
                    if !sids.insert(sid.to_ascii_uppercase()) {
                        return Err(AdAclError::InvalidConfig(format!(
                            "directory sid [{}] is used by more than one entry",
                            sid
                        )));
                    }
                }
                (None, false) => {}
            }
        }

        let mut memberships = Vec::with_capacity(state.entries.len());
        for entry in &state.entries {
            let mut groups = Vec::with_capacity(entry.member_of.len());
            for group in &entry.member_of {
                let position = state
                    .find(group, |candidate| candidate.kind == ObjectKind::Group)
                    .map_err(|e| {
                        AdAclError::InvalidConfig(format!(
                            "directory entry [{}] is a member of [{}]: {}",
                            entry.name, group, e
                        ))
                    })?;
                groups.push(position);
            }
            memberships.push(groups);
        }
        state.memberships = memberships;

        Ok(state)
    }

    /// Position of the single entry matching `identity` and `filter`. An
    /// exact security identifier match wins over name and alias matches.
    fn find(
        &self,
        identity: &str,
        filter: impl Fn(&DirectoryEntryRecord) -> bool,
    ) -> Result<usize> {
        let identity = identity.trim();
        if let Some(position) = self
            .entries
            .iter()
            .position(|entry| filter(entry) && entry.has_sid(identity))
        {
            return Ok(position);
        }

        let mut matches = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| filter(entry) && entry.matches(identity))
            .map(|(position, _)| position);

        match (matches.next(), matches.next()) {
            (Some(position), None) => Ok(position),
            (None, _) => Err(AdAclError::NotFound(identity.to_string())),
            (Some(_), Some(_)) => Err(AdAclError::Ambiguous(identity.to_string())),
        }
    }

    fn find_principal(&self, identity: &str) -> Result<usize> {
        self.find(identity, |entry| entry.kind.is_principal())
    }

    fn find_object(&self, identity: &str) -> Result<usize> {
        self.find(identity, |_| true)
    }

    fn principal(&self, position: usize) -> Result<PrincipalIdentity> {
        let entry = &self.entries[position];
        let sid = entry
            .sid
            .as_deref()
            .ok_or_else(|| AdAclError::NotFound(entry.name.clone()))?;
        Ok(PrincipalIdentity {
            sid: Arc::from(sid),
            name: entry.name.clone(),
            kind: entry.kind,
        })
    }

    fn group_closure(&self, position: usize) -> HashSet<IdentityRef> {
        let mut visited = HashSet::new();
        let mut closure = HashSet::new();
        let mut queue: VecDeque<usize> = self.memberships[position].iter().copied().collect();

        while let Some(group) = queue.pop_front() {
            if !visited.insert(group) {
                continue;
            }
            if let Some(sid) = &self.entries[group].sid {
                closure.insert(Arc::from(sid.as_str()));
            }
            queue.extend(self.memberships[group].iter().copied());
        }

        closure
    }

    /// Stored security identifier and name of the principal owning `sid`
    fn trustee(&self, sid: &str) -> Option<(&str, &str)> {
        self.entries
            .iter()
            .filter(|entry| entry.kind.is_principal())
            .find_map(|entry| {
                entry
                    .sid
                    .as_deref()
                    .filter(|stored| stored.eq_ignore_ascii_case(sid))
                    .map(|stored| (stored, entry.name.as_str()))
            })
    }

    /// Entry for `spec` keyed by the stored form of its trustee's identifier
    fn canonical_entry(&self, spec: &AccessRuleSpec) -> Result<AccessRuleEntry> {
        let (sid, _) = self
            .trustee(&spec.principal)
            .ok_or_else(|| AdAclError::NotFound(format!("trustee [{}]", spec.principal)))?;
        let mut entry = spec.to_entry();
        entry.identity_reference = Arc::from(sid);
        Ok(entry)
    }
}

/// Directory store kept in process memory
pub struct InMemoryDirectoryStore {
    state: AsyncRwLock<DirectoryState>,
    available: AtomicBool,
}

impl InMemoryDirectoryStore {
    /// Build a store, checking that principals carry unique security
    /// identifiers and that every membership names an existing group
    pub fn new(snapshot: DirectorySnapshot) -> Result<Self> {
        let state = DirectoryState::build(snapshot)?;
        info!(entries = state.entries.len(), "Loaded directory snapshot");
        Ok(Self {
            state: AsyncRwLock::new(state),
            available: AtomicBool::new(true),
        })
    }

    pub fn empty() -> Self {
        Self {
            state: AsyncRwLock::new(DirectoryState::default()),
            available: AtomicBool::new(true),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(DirectorySnapshot::from_file(path)?)
    }

    /// Take the directory offline or bring it back. While offline every
    /// operation fails with `DirectoryUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(AdAclError::DirectoryUnavailable(
                "in-memory directory is offline".to_string(),
            ))
        }
    }

    pub async fn snapshot(&self) -> DirectorySnapshot {
        DirectorySnapshot {
            entries: self.state.read().await.entries.clone(),
        }
    }

    /// Write the current contents as pretty-printed JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot().await)?;
        tokio::fs::write(path.as_ref(), json).await?;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    async fn mutate_rules<F>(&self, target: &str, mutation: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<AccessRuleEntry>),
    {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let position = state.find_object(target)?;
        mutation(&mut state.entries[position].access_rules);
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn resolve_principal(&self, identity: &str) -> Result<PrincipalIdentity> {
        self.ensure_available()?;
        let state = self.state.read().await;
        let position = state.find_principal(identity)?;
        state.principal(position)
    }

    async fn get_group_closure(&self, sid: &str) -> Result<HashSet<IdentityRef>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        let position = state.find(sid, |entry| entry.has_sid(sid))?;
        Ok(state.group_closure(position))
    }

    async fn get_access_rules(&self, target: &str) -> Result<Vec<AccessRuleEntry>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        let position = state.find_object(target)?;

        state.entries[position]
            .access_rules
            .iter()
            .map(|rule| {
                state
                    .trustee(&rule.identity_reference)
                    .map(|(sid, name)| {
                        let mut resolved = rule.clone().with_identity_name(name);
                        resolved.identity_reference = Arc::from(sid);
                        resolved
                    })
                    .ok_or_else(|| {
                        AdAclError::NotFound(format!(
                            "trustee [{}] of an access rule on [{}]",
                            rule.identity_reference, target
                        ))
                    })
            })
            .collect()
    }

    async fn add_access_rule(&self, target: &str, spec: &AccessRuleSpec) -> Result<()> {
        self.ensure_available()?;
        let entry = self.state.read().await.canonical_entry(spec)?;
        self.mutate_rules(target, |rules| rules.push(entry)).await?;
        debug!(target_object = target, principal = %spec.principal, rights = %spec.rights, "Added access rule");
        Ok(())
    }

    async fn remove_access_rule(&self, target: &str, spec: &AccessRuleSpec) -> Result<()> {
        self.mutate_rules(target, |rules| {
            for rule in rules.iter_mut().filter(|rule| rule.matches_spec(spec)) {
                rule.rights = rule.rights.difference(spec.rights);
            }
            rules.retain(|rule| !(rule.matches_spec(spec) && rule.rights.is_empty()));
        })
        .await?;
        debug!(target_object = target, principal = %spec.principal, rights = %spec.rights, "Removed access rule");
        Ok(())
    }

    async fn set_access_rule(&self, target: &str, spec: &AccessRuleSpec) -> Result<()> {
        self.ensure_available()?;
        let entry = self.state.read().await.canonical_entry(spec)?;
        self.mutate_rules(target, |rules| {
            rules.retain(|rule| {
                rule.is_inherited
                    || !rule.applies_to(&spec.principal)
                    || rule.control_type != spec.control_type
            });
            rules.push(entry);
        })
        .await?;
        debug!(target_object = target, principal = %spec.principal, rights = %spec.rights, "Set access rule");
        Ok(())
    }

    async fn purge_access_rules(&self, target: &str, sid: &str) -> Result<()> {
        self.mutate_rules(target, |rules| {
            rules.retain(|rule| rule.is_inherited || !rule.applies_to(sid));
        })
        .await?;
        debug!(target_object = target, principal = sid, "Purged access rules");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::acl::{ControlType, DirectoryRights, SecurityInheritance};
    use pretty_assertions::assert_eq;

    const OU: &str = "OU=Sales,DC=corp,DC=local";

    fn store() -> InMemoryDirectoryStore {
        let snapshot = DirectorySnapshot::new()
            .with_entry(
                DirectoryEntryRecord::user("S-1-5-21-1001", "alice", "CN=alice,OU=Staff,DC=corp,DC=local")
                    .with_alias("alice@corp.local")
                    .member_of("Helpdesk"),
            )
            .with_entry(DirectoryEntryRecord::user("S-1-5-21-1002", "bob", "CN=bob,OU=Staff,DC=corp,DC=local"))
            .with_entry(
                DirectoryEntryRecord::group("S-1-5-21-2001", "Helpdesk", "CN=Helpdesk,DC=corp,DC=local")
                    .member_of("IT"),
            )
            .with_entry(
                DirectoryEntryRecord::group("S-1-5-21-2002", "IT", "CN=IT,DC=corp,DC=local")
                    .member_of("Helpdesk"),
            )
            .with_entry(
                DirectoryEntryRecord::organizational_unit("Sales", OU)
                    .with_rule(AccessRuleEntry::allow("S-1-5-21-2001", DirectoryRights::GENERIC_READ).inherited()),
            );
        InMemoryDirectoryStore::new(snapshot).unwrap()
    }

    fn spec(sid: &str, rights: DirectoryRights) -> AccessRuleSpec {
        AccessRuleSpec::new(Arc::from(sid), rights, ControlType::Allow)
    }

    #[tokio::test]
    async fn test_resolve_principal_by_any_identity() {
        let store = store();
        for identity in ["S-1-5-21-1001", "ALICE", "cn=alice,ou=staff,dc=corp,dc=local", "alice@corp.local"] {
            let principal = store.resolve_principal(identity).await.unwrap();
            assert_eq!(&*principal.sid, "S-1-5-21-1001");
            assert_eq!(principal.kind, ObjectKind::User);
        }

        assert!(matches!(
            store.resolve_principal("carol").await,
            Err(AdAclError::NotFound(_))
        ));
        // OUs are not principals
        assert!(matches!(
            store.resolve_principal("Sales").await,
            Err(AdAclError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ambiguous_identity() {
        let snapshot = DirectorySnapshot::new()
            .with_entry(DirectoryEntryRecord::user("S-1", "sam", "CN=sam,DC=a").with_alias("ops"))
            .with_entry(DirectoryEntryRecord::group("S-2", "ops", "CN=ops,DC=a"));
        let store = InMemoryDirectoryStore::new(snapshot).unwrap();

        assert!(matches!(
            store.resolve_principal("ops").await,
            Err(AdAclError::Ambiguous(_))
        ));
        assert_eq!(store.resolve_principal("S-2").await.unwrap().name, "ops");
    }

    #[tokio::test]
    async fn test_group_closure_handles_nesting_and_cycles() {
        let store = store();

        let closure = store.get_group_closure("S-1-5-21-1001").await.unwrap();
        let expected: HashSet<IdentityRef> = ["S-1-5-21-2001", "S-1-5-21-2002"]
            .into_iter()
            .map(Arc::from)
            .collect();
        assert_eq!(closure, expected);

        assert!(store.get_group_closure("S-1-5-21-1002").await.unwrap().is_empty());
        assert!(matches!(
            store.get_group_closure("S-9").await,
            Err(AdAclError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_access_rules_carry_trustee_names() {
        let store = store();
        let rules = store.get_access_rules(OU).await.unwrap();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].identity_name.as_deref(), Some("Helpdesk"));
        assert!(rules[0].is_inherited);
    }

    #[tokio::test]
    async fn test_add_appends_and_remove_subtracts() {
        let store = store();
        let write = spec("S-1-5-21-1002", DirectoryRights::GENERIC_WRITE);

        store.add_access_rule(OU, &write).await.unwrap();
        store.add_access_rule(OU, &write).await.unwrap();
        assert_eq!(store.get_access_rules(OU).await.unwrap().len(), 3);

        let partial = spec("S-1-5-21-1002", DirectoryRights::WRITE_PROPERTY);
        store.remove_access_rule(OU, &partial).await.unwrap();
        let rules = store.get_access_rules(OU).await.unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(
            rules[1].rights,
            DirectoryRights::READ_CONTROL | DirectoryRights::SELF
        );

        let rest = spec("S-1-5-21-1002", DirectoryRights::READ_CONTROL | DirectoryRights::SELF);
        store.remove_access_rule(OU, &rest).await.unwrap();
        assert_eq!(store.get_access_rules(OU).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_ignores_inherited_and_mismatched_entries() {
        let store = store();

        let inherited = spec("S-1-5-21-2001", DirectoryRights::GENERIC_READ);
        store.remove_access_rule(OU, &inherited).await.unwrap();
        assert_eq!(store.get_access_rules(OU).await.unwrap().len(), 1);

        let scoped = spec("S-1-5-21-1002", DirectoryRights::DELETE)
            .with_inheritance(SecurityInheritance::All);
        store.add_access_rule(OU, &scoped).await.unwrap();
        store
            .remove_access_rule(OU, &spec("S-1-5-21-1002", DirectoryRights::DELETE))
            .await
            .unwrap();
        assert_eq!(store.get_access_rules(OU).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_set_replaces_and_purge_clears_explicit_entries() {
        let store = store();
        store
            .add_access_rule(OU, &spec("S-1-5-21-2001", DirectoryRights::DELETE))
            .await
            .unwrap();
        store
            .add_access_rule(OU, &spec("S-1-5-21-2001", DirectoryRights::CREATE_CHILD))
            .await
            .unwrap();

        store
            .set_access_rule(OU, &spec("S-1-5-21-2001", DirectoryRights::LIST_CHILDREN))
            .await
            .unwrap();
        let rules = store.get_access_rules(OU).await.unwrap();
        assert_eq!(rules.len(), 2);
        assert!(rules[0].is_inherited);
        assert_eq!(rules[1].rights, DirectoryRights::LIST_CHILDREN);

        store.purge_access_rules(OU, "S-1-5-21-2001").await.unwrap();
        let rules = store.get_access_rules(OU).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].is_inherited);
    }

    #[tokio::test]
    async fn test_mixed_case_sids_resolve_to_stored_form() {
        let snapshot = DirectorySnapshot::new()
            .with_entry(DirectoryEntryRecord::user("S-1-5-21-1001", "alice", "CN=alice,DC=corp,DC=local"))
            .with_entry(
                DirectoryEntryRecord::organizational_unit("Sales", OU)
                    .with_rule(AccessRuleEntry::allow("S-1-5-21-1001", DirectoryRights::DELETE))
                    .with_rule(AccessRuleEntry::deny("s-1-5-21-1001", DirectoryRights::DELETE)),
            );
        let store = InMemoryDirectoryStore::new(snapshot).unwrap();

        let rules = store.get_access_rules(OU).await.unwrap();
        assert_eq!(rules.len(), 2);
        for rule in &rules {
            assert_eq!(&*rule.identity_reference, "S-1-5-21-1001");
            assert_eq!(rule.identity_name.as_deref(), Some("alice"));
        }

        let deny = AccessRuleSpec::new(Arc::from("S-1-5-21-1001"), DirectoryRights::DELETE, ControlType::Deny);
        store.remove_access_rule(OU, &deny).await.unwrap();
        let rules = store.get_access_rules(OU).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].control_type, ControlType::Allow);

        store
            .add_access_rule(OU, &spec("s-1-5-21-1001", DirectoryRights::CREATE_CHILD))
            .await
            .unwrap();
        let stored = store.snapshot().await.entries[1].access_rules.clone();
        assert_eq!(&*stored[1].identity_reference, "S-1-5-21-1001");

        store.purge_access_rules(OU, "s-1-5-21-1001").await.unwrap();
        assert!(store.get_access_rules(OU).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_trustee_rejected() {
        let store = store();
        let err = store
            .add_access_rule(OU, &spec("S-1-5-21-9999", DirectoryRights::DELETE))
            .await
            .unwrap_err();
        assert!(matches!(err, AdAclError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_operation() {
        let store = store();
        store.set_available(false);

        assert!(matches!(
            store.resolve_principal("alice").await,
            Err(AdAclError::DirectoryUnavailable(_))
        ));
        assert!(matches!(
            store.get_access_rules(OU).await,
            Err(AdAclError::DirectoryUnavailable(_))
        ));
        assert!(matches!(
            store.purge_access_rules(OU, "S-1-5-21-1001").await,
            Err(AdAclError::DirectoryUnavailable(_))
        ));

        store.set_available(true);
        assert!(store.resolve_principal("alice").await.is_ok());
    }

    #[test]
    fn test_snapshot_validation() {
        let missing_sid = DirectorySnapshot {
            entries: vec![DirectoryEntryRecord {
                sid: None,
                ..DirectoryEntryRecord::user("S-1", "ghost", "CN=ghost")
            }],
        };
        assert!(InMemoryDirectoryStore::new(missing_sid).is_err());

        let unknown_group = DirectorySnapshot::new()
            .with_entry(DirectoryEntryRecord::user("S-1", "alice", "CN=alice").member_of("Nobody"));
        assert!(InMemoryDirectoryStore::new(unknown_group).is_err());

        let duplicate_sid = DirectorySnapshot::new()
            .with_entry(DirectoryEntryRecord::user("S-1", "alice", "CN=alice"))
            .with_entry(DirectoryEntryRecord::group("s-1", "team", "CN=team"));
        assert!(InMemoryDirectoryStore::new(duplicate_sid).is_err());
    }

    #[tokio::test]
    async fn test_save_and_reload_snapshot() {
        let store = store();
        store
            .add_access_rule(OU, &spec("S-1-5-21-1002", DirectoryRights::DELETE))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        store.save(&path).await.unwrap();

        let reloaded = InMemoryDirectoryStore::from_file(&path).unwrap();
        assert_eq!(reloaded.snapshot().await, store.snapshot().await);
    }
}
