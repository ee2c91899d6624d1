//! Batch Dispatch
//!
//! Applies one action to a list of directory objects. Every object is gated
//! through the role manager, processed independently and reported with its
//! own statuses; a failure on one object never affects another.
//!
//! Objects run either one after another or as tokio tasks bounded by a
//! semaphore. Results always come back in request order.

pub mod request;
pub mod results;

pub use request::{AccessRuleRequest, AdObject, BatchRequest, RoleRequest};
pub use results::{ActionStatus, BatchResults, ObjectResult, StatusType};

use crate::config::DispatchConfig;
use crate::directory::DirectoryStore;
use crate::error::{AdAclError, Result};
use crate::security::acl::AccessRuleSpec;
use crate::security::roles::{ActionType, RoleManagerTrait};
use crate::types::ObjectKind;

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleOperation {
    Add,
    Remove,
    Set,
    Purge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleOperation {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchOperation {
    Get,
    Rule(RuleOperation),
    Role(RoleOperation),
}

impl BatchOperation {
    fn from_action(action: ActionType) -> Option<Self> {
        let supported = [
            (ActionType::GET, BatchOperation::Get),
            (ActionType::ADD_ACCESS_RULE, BatchOperation::Rule(RuleOperation::Add)),
            (ActionType::REMOVE_ACCESS_RULE, BatchOperation::Rule(RuleOperation::Remove)),
            (ActionType::SET_ACCESS_RULE, BatchOperation::Rule(RuleOperation::Set)),
            (ActionType::PURGE_ACCESS_RULES, BatchOperation::Rule(RuleOperation::Purge)),
            (ActionType::ADD_ROLE, BatchOperation::Role(RoleOperation::Add)),
            (ActionType::REMOVE_ROLE, BatchOperation::Role(RoleOperation::Remove)),
        ];
        supported
            .iter()
            .find(|(candidate, _)| *candidate == action)
            .map(|(_, operation)| *operation)
    }
}

/// Fan-out executor for batch requests
#[derive(Clone)]
pub struct BatchDispatcher {
    role_manager: Arc<dyn RoleManagerTrait>,
    directory: Arc<dyn DirectoryStore>,
    config: DispatchConfig,
    permits: Arc<Semaphore>,
}

impl BatchDispatcher {
    pub fn new(
        role_manager: Arc<dyn RoleManagerTrait>,
        directory: Arc<dyn DirectoryStore>,
        config: DispatchConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_parallelism.max(1)));
        Self {
            role_manager,
            directory,
            config,
            permits,
        }
    }

    /// Actions a batch may carry
    pub fn supported_actions() -> ActionType {
        ActionType::GET
            | ActionType::ADD_ACCESS_RULE
            | ActionType::REMOVE_ACCESS_RULE
            | ActionType::SET_ACCESS_RULE
            | ActionType::PURGE_ACCESS_RULES
            | ActionType::ADD_ROLE
            | ActionType::REMOVE_ROLE
    }

    /// Run `request` on behalf of `requester`. Fails as a whole only when the
    /// action is unsupported; everything else is reported per object.
    pub async fn execute(&self, requester: &str, request: BatchRequest) -> Result<BatchResults> {
        let action = request.action;
        let operation = BatchOperation::from_action(action).ok_or_else(|| {
            AdAclError::NotSupported(format!(
                "action [{}] is not supported in a batch request",
                action
            ))
        })?;

        let batch_id = Uuid::new_v4();
        info!(
            %batch_id,
            requester,
            action = %action,
            objects = request.objects.len(),
            sequential = self.config.run_sequential,
            "Executing batch"
        );

        let results = if self.config.run_sequential {
            let mut results = Vec::with_capacity(request.objects.len());
            for object in request.objects {
                results.push(self.process_object(requester, operation, action, object).await);
            }
            results
        } else {
            self.execute_parallel(requester, operation, action, request.objects)
                .await
        };

        let batch = BatchResults {
            batch_id,
            action: action.to_string(),
            results,
        };
        info!(
            %batch_id,
            succeeded = batch.succeeded(),
            failed = batch.failed(),
            "Batch complete"
        );
        Ok(batch)
    }

    async fn execute_parallel(
        &self,
        requester: &str,
        operation: BatchOperation,
        action: ActionType,
        objects: Vec<AdObject>,
    ) -> Vec<ObjectResult> {
        let placeholders: Vec<ObjectResult> = objects
            .iter()
            .map(|object| ObjectResult::new(object.kind, object.identity.clone()))
            .collect();

        let tasks: Vec<_> = objects
            .into_iter()
            .map(|object| {
                let dispatcher = self.clone();
                let requester = requester.to_string();

                tokio::spawn(async move {
                    let _permit = match dispatcher.permits.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            let mut result = ObjectResult::new(object.kind, object.identity);
                            result.push_error(action, &AdAclError::TaskFailed(e.to_string()));
                            return result;
                        }
                    };
                    dispatcher
                        .process_object(&requester, operation, action, object)
                        .await
                })
            })
            .collect();

        join_all(tasks)
            .await
            .into_iter()
            .zip(placeholders)
            .map(|(joined, mut placeholder)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(identity = %placeholder.identity, "Batch task failed: {}", e);
                    placeholder.push_error(action, &AdAclError::TaskFailed(e.to_string()));
                    placeholder
                }
            })
            .collect()
    }

    async fn process_object(
        &self,
        requester: &str,
        operation: BatchOperation,
        action: ActionType,
        object: AdObject,
    ) -> ObjectResult {
        let mut result = ObjectResult::new(object.kind, object.identity.clone());
        if let Err(e) = self
            .apply(requester, operation, action, &object, &mut result)
            .await
        {
            debug!(identity = %object.identity, error = %e, "Batch object failed");
            result.push_error(action, &e);
        }
        result
    }

    async fn apply(
        &self,
        requester: &str,
        operation: BatchOperation,
        action: ActionType,
        object: &AdObject,
        result: &mut ObjectResult,
    ) -> Result<()> {
        match operation {
            BatchOperation::Rule(_) if object.access_rules.is_empty() => {
                return Err(AdAclError::InvalidRequest(format!(
                    "no access rules given for {} [{}]",
                    object.kind, object.identity
                )));
            }
            BatchOperation::Role(_) if object.roles.is_empty() => {
                return Err(AdAclError::InvalidRequest(format!(
                    "no roles given for {} [{}]",
                    object.kind, object.identity
                )));
            }
            _ => {}
        }

        self.role_manager
            .can_perform_action_or_error(requester, action, &object.identity)
            .await?;

        let target = self.resolve_target(object).await?;

        match operation {
            BatchOperation::Get => {
                result.access_rules = Some(self.directory.get_access_rules(&target).await?);
                result.push_success(
                    action,
                    format!("Retrieved access rules of {} [{}]", object.kind, object.identity),
                );
                return Ok(());
            }
            BatchOperation::Rule(rule_operation) => {
                for rule in &object.access_rules {
                    let message = self.apply_rule(rule_operation, &target, object, rule).await?;
                    result.push_success(action, message);
                }
            }
            BatchOperation::Role(role_operation) => {
                for role in &object.roles {
                    let message = self.apply_role(role_operation, &target, object, role).await?;
                    result.push_success(action, message);
                }
            }
        }

        if self.config.return_access_rules {
            result.access_rules = Some(self.directory.get_access_rules(&target).await?);
        }
        Ok(())
    }

    async fn apply_rule(
        &self,
        operation: RuleOperation,
        target: &str,
        object: &AdObject,
        rule: &AccessRuleRequest,
    ) -> Result<String> {
        let trustee = self.directory.resolve_principal(&rule.identity).await?;
        let spec = AccessRuleSpec::new(trustee.sid.clone(), rule.rights, rule.control_type)
            .with_inheritance(rule.inheritance);

        let message = match operation {
            RuleOperation::Add => {
                self.directory.add_access_rule(target, &spec).await?;
                format!(
                    "{} [{}] rule added to {} [{}] for [{}]",
                    rule.control_type, rule.rights, object.kind, object.identity, rule.identity
                )
            }
            RuleOperation::Remove => {
                self.directory.remove_access_rule(target, &spec).await?;
                format!(
                    "{} [{}] rule removed from {} [{}] for [{}]",
                    rule.control_type, rule.rights, object.kind, object.identity, rule.identity
                )
            }
            RuleOperation::Set => {
                self.directory.set_access_rule(target, &spec).await?;
                format!(
                    "{} [{}] rule set on {} [{}] for [{}]",
                    rule.control_type, rule.rights, object.kind, object.identity, rule.identity
                )
            }
            RuleOperation::Purge => {
                self.directory.purge_access_rules(target, &trustee.sid).await?;
                format!(
                    "All rules purged on {} [{}] for [{}]",
                    object.kind, object.identity, rule.identity
                )
            }
        };
        Ok(message)
    }

    async fn apply_role(
        &self,
        operation: RoleOperation,
        target: &str,
        object: &AdObject,
        role: &RoleRequest,
    ) -> Result<String> {
        let message = match operation {
            RoleOperation::Add => {
                self.role_manager
                    .add_role(&role.principal, &role.name, target)
                    .await?;
                format!(
                    "Role [{}] added to {} [{}] for [{}]",
                    role.name, object.kind, object.identity, role.principal
                )
            }
            RoleOperation::Remove => {
                self.role_manager
                    .remove_role(&role.principal, &role.name, target)
                    .await?;
                format!(
                    "Role [{}] removed from {} [{}] for [{}]",
                    role.name, object.kind, object.identity, role.principal
                )
            }
        };
        Ok(message)
    }

    /// Users and groups must resolve as principals of the requested kind;
    /// organizational units are addressed by identity
    async fn resolve_target(&self, object: &AdObject) -> Result<String> {
        match object.kind {
            ObjectKind::User | ObjectKind::Group => {
                let principal = self.directory.resolve_principal(&object.identity).await?;
                if principal.kind != object.kind {
                    return Err(AdAclError::NotFound(format!(
                        "{} [{}]",
                        object.kind, object.identity
                    )));
                }
                Ok(principal.sid.to_string())
            }
            ObjectKind::OrganizationalUnit => Ok(object.identity.clone()),
        }
    }
}
