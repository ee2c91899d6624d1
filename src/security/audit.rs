//! Authorization Audit Trail
//!
//! Every access decision and role change is recorded as an [`AuditEvent`],
//! emitted under the `adacl::audit` tracing target and kept in a bounded
//! in-memory buffer for inspection.

use crate::config::AuditConfig;
use crate::security::acl::AuthorizationDecision;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{info, warn};

pub const AUDIT_TARGET: &str = "adacl::audit";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    AccessCheck,
    RoleCheck,
    RoleGranted,
    RoleRevoked,
    CatalogReloaded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Allowed,
    Denied,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub operation: AuditOperation,
    pub outcome: AuditOutcome,
    pub principal: Option<String>,
    pub target: Option<String>,
    pub action: Option<String>,
    pub role: Option<String>,
    pub detail: Option<String>,
}

impl AuditEvent {
    fn new(operation: AuditOperation, outcome: AuditOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            outcome,
            principal: None,
            target: None,
            action: None,
            role: None,
            detail: None,
        }
    }

    fn on(mut self, principal: &str, target: &str) -> Self {
        self.principal = Some(principal.to_string());
        self.target = Some(target.to_string());
        self
    }
}

/// Bounded audit recorder
#[derive(Debug)]
pub struct AuditLogger {
    enabled: bool,
    log_allowed_decisions: bool,
    max_buffered_events: usize,
    buffer: Mutex<VecDeque<AuditEvent>>,
}

impl AuditLogger {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            enabled: config.enabled,
            log_allowed_decisions: config.log_allowed_decisions,
            max_buffered_events: config.max_buffered_events,
            buffer: Mutex::new(VecDeque::new()),
        }
    }

    /// A logger that records nothing
    pub fn disabled() -> Self {
        Self::new(&AuditConfig {
            enabled: false,
            ..Default::default()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log_access_check(
        &self,
        principal: &str,
        action: &str,
        target: &str,
        decision: &AuthorizationDecision,
    ) {
        if !self.enabled || (decision.is_allowed() && !self.log_allowed_decisions) {
            return;
        }

        let outcome = if decision.is_allowed() {
            AuditOutcome::Allowed
        } else {
            AuditOutcome::Denied
        };
        let mut event = AuditEvent::new(AuditOperation::AccessCheck, outcome).on(principal, target);
        event.action = Some(action.to_string());
        event.role = decision.granting_role().map(str::to_string);
        event.detail = decision.denial_reason().map(str::to_string);
        self.record(event);
    }

    pub fn log_role_check(&self, principal: &str, role: &str, target: &str, satisfied: bool) {
        if !self.enabled || (satisfied && !self.log_allowed_decisions) {
            return;
        }

        let outcome = if satisfied {
            AuditOutcome::Allowed
        } else {
            AuditOutcome::Denied
        };
        let mut event = AuditEvent::new(AuditOperation::RoleCheck, outcome).on(principal, target);
        event.role = Some(role.to_string());
        self.record(event);
    }

    /// Record a role grant or revocation. `error` is the failure, if any.
    pub fn log_role_change(
        &self,
        operation: AuditOperation,
        principal: &str,
        role: &str,
        target: &str,
        error: Option<&str>,
    ) {
        if !self.enabled {
            return;
        }

        let outcome = match error {
            Some(_) => AuditOutcome::Failed,
            None => AuditOutcome::Succeeded,
        };
        let mut event = AuditEvent::new(operation, outcome).on(principal, target);
        event.role = Some(role.to_string());
        event.detail = error.map(str::to_string);
        self.record(event);
    }

    pub fn log_reload(&self, role_count: usize, error: Option<&str>) {
        if !self.enabled {
            return;
        }

        let (outcome, detail) = match error {
            Some(err) => (AuditOutcome::Failed, err.to_string()),
            None => (AuditOutcome::Succeeded, format!("{} roles loaded", role_count)),
        };
        let mut event = AuditEvent::new(AuditOperation::CatalogReloaded, outcome);
        event.detail = Some(detail);
        self.record(event);
    }

    fn record(&self, event: AuditEvent) {
        match event.outcome {
            AuditOutcome::Failed => warn!(
                target: AUDIT_TARGET,
                operation = ?event.operation,
                principal = ?event.principal,
                target_object = ?event.target,
                role = ?event.role,
                detail = ?event.detail,
                "Audit event"
            ),
            _ => info!(
                target: AUDIT_TARGET,
                operation = ?event.operation,
                outcome = ?event.outcome,
                principal = ?event.principal,
                target_object = ?event.target,
                action = ?event.action,
                role = ?event.role,
                "Audit event"
            ),
        }

        let mut buffer = self.buffer.lock();
        buffer.push_back(event);
        while buffer.len() > self.max_buffered_events {
            buffer.pop_front();
        }
    }

    /// Most recent events, oldest first
    pub fn recent_events(&self, limit: usize) -> Vec<AuditEvent> {
        let buffer = self.buffer.lock();
        let skip = buffer.len().saturating_sub(limit);
        buffer.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}
