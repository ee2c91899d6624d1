//! Effective Rights Aggregation
//!
//! Folds the access-control entries of one directory object into the rights a
//! principal holds on it, given the principal's group-membership closure.
//!
//! Two deny strategies are supported:
//!
//! - **Union**: Deny entries are folded into the same mask as Allow entries.
//!   This matches the behavior of the directory role manager this engine
//!   replaces and is the default.
//! - **Precedence**: Allow and Deny are folded separately and denied rights
//!   are subtracted from allowed rights.

use super::{AccessRuleEntry, ControlType, DirectoryRights};
use crate::types::IdentityRef;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// How Deny entries contribute to effective rights
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DenyEvaluation {
    #[default]
    Union,
    Precedence,
}

/// Allowed and denied rights folded for one identity or a whole closure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RightsBreakdown {
    pub allowed: DirectoryRights,
    pub denied: DirectoryRights,
}

impl RightsBreakdown {
    fn record(&mut self, entry: &AccessRuleEntry) {
        match entry.control_type {
            ControlType::Allow => self.allowed |= entry.rights,
            ControlType::Deny => self.denied |= entry.rights,
        }
    }

    fn merge(&mut self, other: &RightsBreakdown) {
        self.allowed |= other.allowed;
        self.denied |= other.denied;
    }

    /// Every right mentioned by any entry, regardless of control type
    pub fn union(&self) -> DirectoryRights {
        self.allowed | self.denied
    }

    /// Allowed rights with denied rights removed
    pub fn net(&self) -> DirectoryRights {
        self.allowed.difference(self.denied)
    }
}

/// Stateless effective-rights calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct RightsAggregator {
    deny_evaluation: DenyEvaluation,
}

impl RightsAggregator {
    pub fn new(deny_evaluation: DenyEvaluation) -> Self {
        Self { deny_evaluation }
    }

    pub fn deny_evaluation(&self) -> DenyEvaluation {
        self.deny_evaluation
    }

    /// Fold the rights of every entry per trustee. Keys are the upper-cased
    /// security identifiers, so entries differing only in case fold together.
    pub fn rights_by_identity(rules: &[AccessRuleEntry]) -> HashMap<IdentityRef, RightsBreakdown> {
        let mut rights: HashMap<IdentityRef, RightsBreakdown> = HashMap::new();
        for rule in rules {
            rights
                .entry(Arc::from(rule.identity_reference.to_ascii_uppercase()))
                .or_default()
                .record(rule);
        }
        rights
    }

    /// Combined breakdown for every identity in `group_closure`.
    ///
    /// The closure must contain the principal's own identity for direct
    /// grants to count.
    pub fn breakdown(
        &self,
        group_closure: &HashSet<IdentityRef>,
        rules: &[AccessRuleEntry],
    ) -> RightsBreakdown {
        let by_identity = Self::rights_by_identity(rules);
        let mut total = RightsBreakdown::default();

        for identity in group_closure {
            if let Some(rights) = by_identity.get(identity.to_ascii_uppercase().as_str()) {
                total.merge(rights);
            }
        }

        total
    }

    /// Effective rights for a closure under the configured deny strategy
    pub fn effective_rights(
        &self,
        group_closure: &HashSet<IdentityRef>,
        rules: &[AccessRuleEntry],
    ) -> DirectoryRights {
        self.resolve(&self.breakdown(group_closure, rules))
    }

    /// Effective rights of an already folded breakdown
    pub fn resolve(&self, breakdown: &RightsBreakdown) -> DirectoryRights {
        match self.deny_evaluation {
            DenyEvaluation::Union => breakdown.union(),
            DenyEvaluation::Precedence => breakdown.net(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closure(ids: &[&str]) -> HashSet<IdentityRef> {
        ids.iter().map(|id| Arc::from(*id)).collect()
    }

    #[test]
    fn test_rights_union_is_order_independent() {
        let forward = vec![
            AccessRuleEntry::allow("S-1", DirectoryRights::READ_PROPERTY),
            AccessRuleEntry::allow("S-1", DirectoryRights::WRITE_PROPERTY),
            AccessRuleEntry::allow("S-1", DirectoryRights::DELETE),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let aggregator = RightsAggregator::default();
        let ids = closure(&["S-1"]);
        let expected = DirectoryRights::READ_PROPERTY
            | DirectoryRights::WRITE_PROPERTY
            | DirectoryRights::DELETE;

        assert_eq!(aggregator.effective_rights(&ids, &forward), expected);
        assert_eq!(aggregator.effective_rights(&ids, &reversed), expected);
    }

    #[test]
    fn test_group_rights_combine_with_direct_rights() {
        let rules = vec![
            AccessRuleEntry::allow("S-GROUP", DirectoryRights::GENERIC_READ),
            AccessRuleEntry::allow("S-USER", DirectoryRights::WRITE_PROPERTY),
            AccessRuleEntry::allow("S-OTHER", DirectoryRights::GENERIC_ALL),
        ];
        let aggregator = RightsAggregator::default();

        let group_only = closure(&["S-GROUP"]);
        assert_eq!(
            aggregator.effective_rights(&group_only, &rules),
            DirectoryRights::GENERIC_READ
        );

        let with_self = closure(&["S-USER", "S-GROUP"]);
        assert_eq!(
            aggregator.effective_rights(&with_self, &rules),
            DirectoryRights::GENERIC_READ | DirectoryRights::WRITE_PROPERTY
        );
    }

    #[test]
    fn test_no_matching_identity_yields_empty_rights() {
        let rules = vec![AccessRuleEntry::allow("S-OTHER", DirectoryRights::GENERIC_ALL)];
        let aggregator = RightsAggregator::default();

        assert!(aggregator.effective_rights(&closure(&["S-USER"]), &rules).is_empty());
        assert!(aggregator.effective_rights(&HashSet::new(), &rules).is_empty());
    }

    #[test]
    fn test_union_mode_folds_deny_into_rights() {
        let rules = vec![
            AccessRuleEntry::allow("S-USER", DirectoryRights::READ_PROPERTY),
            AccessRuleEntry::deny("S-USER", DirectoryRights::DELETE),
        ];
        let aggregator = RightsAggregator::new(DenyEvaluation::Union);

        assert_eq!(
            aggregator.effective_rights(&closure(&["S-USER"]), &rules),
            DirectoryRights::READ_PROPERTY | DirectoryRights::DELETE
        );
    }

    #[test]
    fn test_precedence_mode_subtracts_group_deny() {
        let rules = vec![
            AccessRuleEntry::allow("S-USER", DirectoryRights::GENERIC_READ | DirectoryRights::DELETE),
            AccessRuleEntry::deny("S-GROUP", DirectoryRights::DELETE),
        ];
        let aggregator = RightsAggregator::new(DenyEvaluation::Precedence);
        let ids = closure(&["S-USER", "S-GROUP"]);

        assert_eq!(aggregator.effective_rights(&ids, &rules), DirectoryRights::GENERIC_READ);

        let breakdown = aggregator.breakdown(&ids, &rules);
        assert_eq!(breakdown.denied, DirectoryRights::DELETE);
        assert!(breakdown.allowed.contains(DirectoryRights::DELETE));
    }

    #[test]
    fn test_deny_matches_trustee_regardless_of_sid_case() {
        let rules = vec![
            AccessRuleEntry::allow("S-1-5-21-1001", DirectoryRights::GENERIC_READ | DirectoryRights::DELETE),
            AccessRuleEntry::deny("s-1-5-21-1001", DirectoryRights::DELETE),
        ];
        let ids = closure(&["S-1-5-21-1001"]);

        let precedence = RightsAggregator::new(DenyEvaluation::Precedence);
        let breakdown = precedence.breakdown(&ids, &rules);
        assert_eq!(breakdown.denied, DirectoryRights::DELETE);
        assert_eq!(precedence.effective_rights(&ids, &rules), DirectoryRights::GENERIC_READ);
        assert_eq!(precedence.resolve(&breakdown), DirectoryRights::GENERIC_READ);

        let union = RightsAggregator::new(DenyEvaluation::Union);
        assert_eq!(
            union.effective_rights(&closure(&["s-1-5-21-1001"]), &rules),
            DirectoryRights::GENERIC_READ | DirectoryRights::DELETE
        );
    }

    #[test]
    fn test_rights_by_identity_groups_entries() {
        let rules = vec![
            AccessRuleEntry::allow("S-1", DirectoryRights::READ_PROPERTY),
            AccessRuleEntry::allow("S-2", DirectoryRights::LIST_CHILDREN),
            AccessRuleEntry::allow("S-1", DirectoryRights::LIST_OBJECT).inherited(),
        ];
        let by_identity = RightsAggregator::rights_by_identity(&rules);

        assert_eq!(by_identity.len(), 2);
        assert_eq!(
            by_identity["S-1"].allowed,
            DirectoryRights::READ_PROPERTY | DirectoryRights::LIST_OBJECT
        );
    }
}
