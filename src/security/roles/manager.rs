//! DACL Role Manager
//!
//! The authorization gate. A principal may perform an action on a target when
//! one of the roles granting that action is satisfied by the principal's
//! effective rights on the target. Effective rights are recomputed from the
//! directory on every call; nothing is cached.

use super::{ActionType, RoleDefinition, RoleSet};
use crate::config::{Config, RoleManagerConfig};
use crate::directory::DirectoryStore;
use crate::error::{AdAclError, Result};
use crate::metrics::AuthorizationMetrics;
use crate::security::acl::{
    AccessRuleEntry, AccessRuleSpec, AuthorizationDecision, ControlType, DirectoryRights,
    RightsAggregator, RightsBreakdown,
};
use crate::security::audit::{AuditLogger, AuditOperation};
use crate::security::roles::CatalogOptions;
use crate::types::IdentityRef;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Public authorization surface
#[async_trait]
pub trait RoleManagerTrait: Send + Sync {
    /// Check if `principal` may perform `action` on `target`
    async fn can_perform_action(
        &self,
        principal: &str,
        action: ActionType,
        target: &str,
    ) -> Result<bool>;

    /// Like [`can_perform_action`](Self::can_perform_action), failing with
    /// `NotAllowed` instead of returning false
    async fn can_perform_action_or_error(
        &self,
        principal: &str,
        action: ActionType,
        target: &str,
    ) -> Result<()>;

    /// Check if `principal` holds every right `role` requires on `target`
    async fn has_role(&self, principal: &str, role: &str, target: &str) -> Result<bool>;

    /// Grant the rights of `role` on `target` to `principal`
    async fn add_role(&self, principal: &str, role: &str, target: &str) -> Result<()>;

    /// Revoke the rights of `role` on `target` from `principal`
    async fn remove_role(&self, principal: &str, role: &str, target: &str) -> Result<()>;

    /// Role names in configuration order
    fn get_roles(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleChange {
    Grant,
    Revoke,
}

impl RoleChange {
    fn audit_operation(self) -> AuditOperation {
        match self {
            RoleChange::Grant => AuditOperation::RoleGranted,
            RoleChange::Revoke => AuditOperation::RoleRevoked,
        }
    }

    fn label(self) -> &'static str {
        match self {
            RoleChange::Grant => "add_role",
            RoleChange::Revoke => "remove_role",
        }
    }
}

pub struct DaclRoleManager {
    roles: RwLock<Arc<RoleSet>>,
    options: CatalogOptions,
    directory: Arc<dyn DirectoryStore>,
    aggregator: RightsAggregator,
    metrics: Arc<AuthorizationMetrics>,
    audit: Arc<AuditLogger>,
}

impl DaclRoleManager {
    /// Create a manager with its own metrics registry and a default audit
    /// logger
    pub fn new(config: &RoleManagerConfig, directory: Arc<dyn DirectoryStore>) -> Result<Self> {
        let options = config.catalog_options();
        let role_set = RoleSet::build(&config.roles, options)?;
        info!(
            roles = role_set.catalog.len(),
            inheritance = ?options.inheritance,
            deny_evaluation = ?config.deny_evaluation,
            "Role catalog loaded"
        );

        Ok(Self {
            roles: RwLock::new(Arc::new(role_set)),
            options,
            directory,
            aggregator: RightsAggregator::new(config.deny_evaluation),
            metrics: Arc::new(AuthorizationMetrics::new()?),
            audit: Arc::new(AuditLogger::new(&Default::default())),
        })
    }

    /// Create a manager from a full configuration, audit settings included
    pub fn from_config(config: &Config, directory: Arc<dyn DirectoryStore>) -> Result<Self> {
        Ok(Self::new(&config.role_manager, directory)?
            .with_audit(Arc::new(AuditLogger::new(&config.audit))))
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<AuthorizationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Current catalog and index
    pub fn role_set(&self) -> Arc<RoleSet> {
        self.roles.read().clone()
    }

    pub fn metrics(&self) -> &Arc<AuthorizationMetrics> {
        &self.metrics
    }

    /// Calculator configured with this manager's deny strategy
    pub fn aggregator(&self) -> RightsAggregator {
        self.aggregator
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    pub fn directory(&self) -> &Arc<dyn DirectoryStore> {
        &self.directory
    }

    /// Replace the catalog. On failure the previous roles stay in effect.
    pub fn reload(&self, definitions: &[RoleDefinition]) -> Result<()> {
        match RoleSet::build(definitions, self.options) {
            Ok(role_set) => {
                let count = role_set.catalog.len();
                *self.roles.write() = Arc::new(role_set);
                self.metrics.record_reload(true);
                self.audit.log_reload(count, None);
                info!(roles = count, "Role catalog reloaded");
                Ok(())
            }
            Err(e) => {
                self.metrics.record_reload(false);
                self.audit.log_reload(0, Some(&e.to_string()));
                warn!(error = %e, "Role catalog reload rejected, keeping previous roles");
                Err(e)
            }
        }
    }

    /// Rights `principal` effectively holds on `target`
    pub async fn effective_rights(&self, principal: &str, target: &str) -> Result<DirectoryRights> {
        let (closure, rules) = self.load_security_context(principal, target).await?;
        Ok(self.aggregator.effective_rights(&closure, &rules))
    }

    /// Allowed and denied rights of `principal` on `target`, before the deny
    /// strategy is applied
    pub async fn rights_breakdown(&self, principal: &str, target: &str) -> Result<RightsBreakdown> {
        let (closure, rules) = self.load_security_context(principal, target).await?;
        Ok(self.aggregator.breakdown(&closure, &rules))
    }

    async fn load_security_context(
        &self,
        principal: &str,
        target: &str,
    ) -> Result<(HashSet<IdentityRef>, Vec<AccessRuleEntry>)> {
        let context = self.fetch_security_context(principal, target).await;
        if let Err(AdAclError::DirectoryUnavailable(reason)) = &context {
            self.metrics.record_directory_failure();
            warn!(principal, target_object = target, reason = %reason, "Directory unavailable during authorization");
        }
        context
    }

    // The closure always includes the principal's own identifier so direct
    // grants count.
    async fn fetch_security_context(
        &self,
        principal: &str,
        target: &str,
    ) -> Result<(HashSet<IdentityRef>, Vec<AccessRuleEntry>)> {
        let resolved = self.directory.resolve_principal(principal).await?;
        let mut closure = self.directory.get_group_closure(&resolved.sid).await?;
        closure.insert(resolved.sid.clone());
        let rules = self.directory.get_access_rules(target).await?;
        Ok((closure, rules))
    }

    /// Evaluate an action and report which role, if any, granted it
    pub async fn evaluate(
        &self,
        principal: &str,
        action: ActionType,
        target: &str,
    ) -> Result<AuthorizationDecision> {
        let started = Instant::now();
        let role_set = self.role_set();

        let decision = match role_set.index.roles_for(action) {
            Some(candidates) if !candidates.is_empty() => {
                let effective = self.effective_rights(principal, target).await?;
                let granted = candidates
                    .iter()
                    .filter_map(|name| role_set.catalog.get(name))
                    .find(|role| role.is_satisfied_by(effective));

                match granted {
                    Some(role) => AuthorizationDecision::Allow {
                        role: role.name.clone(),
                    },
                    None => AuthorizationDecision::Deny {
                        reason: format!(
                            "effective rights [{}] satisfy none of [{}]",
                            effective,
                            candidates.join(", ")
                        ),
                    },
                }
            }
            _ => AuthorizationDecision::NoMatch,
        };

        let action_name = action.to_string();
        self.metrics
            .record_decision(&action_name, decision.is_allowed(), started.elapsed());
        self.audit
            .log_access_check(principal, &action_name, target, &decision);
        debug!(principal, action = %action_name, target_object = target, ?decision, "Authorization decision");

        Ok(decision)
    }

    fn access_spec(&self, sid: IdentityRef, role_name: &str) -> Result<AccessRuleSpec> {
        let role_set = self.role_set();
        let role = role_set.catalog.require(role_name)?;
        if role.directory_rights.is_empty() {
            return Err(AdAclError::NotSupported(format!(
                "role [{}] requires no directory rights and cannot be granted or revoked",
                role_name
            )));
        }
        Ok(AccessRuleSpec::new(sid, role.directory_rights, ControlType::Allow))
    }

    async fn apply_role_change(
        &self,
        change: RoleChange,
        principal: &str,
        role: &str,
        target: &str,
    ) -> Result<()> {
        let resolved = self.directory.resolve_principal(principal).await?;
        let spec = self.access_spec(resolved.sid, role)?;
        match change {
            RoleChange::Grant => self.directory.add_access_rule(target, &spec).await,
            RoleChange::Revoke => self.directory.remove_access_rule(target, &spec).await,
        }
    }

    async fn change_role(
        &self,
        change: RoleChange,
        principal: &str,
        role: &str,
        target: &str,
    ) -> Result<()> {
        // Unknown roles fail before any directory I/O
        self.role_set().catalog.require(role)?;

        let result = self.apply_role_change(change, principal, role, target).await;

        let operation = change.audit_operation();
        let label = change.label();
        self.metrics.record_role_change(label, result.is_ok());

        match &result {
            Ok(()) => {
                self.audit
                    .log_role_change(operation, principal, role, target, None);
                info!(principal, role, target_object = target, operation = label, "Role change applied");
            }
            Err(e) => {
                if matches!(e, AdAclError::DirectoryUnavailable(_)) {
                    self.metrics.record_directory_failure();
                }
                self.audit
                    .log_role_change(operation, principal, role, target, Some(&e.to_string()));
                warn!(principal, role, target_object = target, operation = label, error = %e, "Role change failed");
            }
        }

        result
    }
}

#[async_trait]
impl RoleManagerTrait for DaclRoleManager {
    async fn can_perform_action(
        &self,
        principal: &str,
        action: ActionType,
        target: &str,
    ) -> Result<bool> {
        Ok(self.evaluate(principal, action, target).await?.is_allowed())
    }

    async fn can_perform_action_or_error(
        &self,
        principal: &str,
        action: ActionType,
        target: &str,
    ) -> Result<()> {
        if self.can_perform_action(principal, action, target).await? {
            Ok(())
        } else {
            Err(AdAclError::NotAllowed {
                principal: principal.to_string(),
                action: action.to_string(),
                target: target.to_string(),
            })
        }
    }

    async fn has_role(&self, principal: &str, role: &str, target: &str) -> Result<bool> {
        let role_set = self.role_set();
        let role = role_set.catalog.require(role)?;

        let effective = self.effective_rights(principal, target).await?;
        let satisfied = role.is_satisfied_by(effective);
        self.audit
            .log_role_check(principal, &role.name, target, satisfied);
        debug!(principal, role = %role.name, target_object = target, satisfied, "Role check");

        Ok(satisfied)
    }

    async fn add_role(&self, principal: &str, role: &str, target: &str) -> Result<()> {
        self.change_role(RoleChange::Grant, principal, role, target)
            .await
    }

    async fn remove_role(&self, principal: &str, role: &str, target: &str) -> Result<()> {
        self.change_role(RoleChange::Revoke, principal, role, target)
            .await
    }

    fn get_roles(&self) -> Vec<String> {
        self.role_set().catalog.names()
    }
}
