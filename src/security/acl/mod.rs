//! Access Control Entries and Effective Rights
//!
//! This module models the discretionary access-control list of a directory
//! object: the rights bitmask, the entries that carry it and the aggregation
//! of those entries into the rights a principal effectively holds.

pub mod aggregator;
pub mod policy;
pub mod rights;
pub mod rules;

pub use aggregator::{DenyEvaluation, RightsAggregator, RightsBreakdown};
pub use policy::{AuthorizationDecision, ControlType};
pub use rights::DirectoryRights;
pub use rules::{AccessRuleEntry, AccessRuleSpec, InheritanceFlags, SecurityInheritance};
