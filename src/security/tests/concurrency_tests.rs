//! Concurrency Tests
//!
//! Authorization checks racing catalog reloads and role changes.

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use crate::directory::DirectoryStore;
    use crate::security::acl::DirectoryRights;
    use crate::security::roles::{ActionType, RoleManagerTrait};

    use std::sync::Arc;
    use tokio::task::JoinSet;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_checks_during_reloads_see_a_consistent_catalog() {
        let harness = create_test_harness();
        let manager = harness.manager.clone();

        let reloader = {
            let manager = manager.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    manager.reload(&standard_roles()).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut checks = JoinSet::new();
        for _ in 0..16 {
            let manager = manager.clone();
            checks.spawn(async move {
                let mut allowed = 0;
                for _ in 0..25 {
                    if manager
                        .can_perform_action("alice", ActionType::MODIFY, FINANCE_OU)
                        .await
                        .unwrap()
                    {
                        allowed += 1;
                    }
                }
                allowed
            });
        }

        while let Some(allowed) = checks.join_next().await {
            assert_eq!(allowed.unwrap(), 25);
        }
        reloader.await.unwrap();
        assert_eq!(
            manager.metrics().catalog_reloads.with_label_values(&["success"]).get(),
            50
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_grants_are_all_applied() {
        let harness = create_test_harness();
        let principals = ["alice", "bob", "carol", "dave"];

        let mut grants = JoinSet::new();
        for principal in principals {
            let manager = harness.manager.clone();
            grants.spawn(async move { manager.add_role(principal, "Reader", SALES_OU).await });
        }
        while let Some(result) = grants.join_next().await {
            result.unwrap().unwrap();
        }

        let rules = harness.directory.get_access_rules(SALES_OU).await.unwrap();
        assert_eq!(rules.len(), principals.len());
        assert!(rules
            .iter()
            .all(|rule| rule.rights == DirectoryRights::GENERIC_READ));

        for principal in principals {
            assert!(harness
                .manager
                .can_perform_action(principal, ActionType::GET, SALES_OU)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn test_shared_manager_is_usable_through_trait_object() {
        let harness = create_test_harness();
        let manager: Arc<dyn RoleManagerTrait> = harness.manager.clone();

        let checks: Vec<_> = (0..8)
            .map(|i| {
                let manager = manager.clone();
                let principal = if i % 2 == 0 { "alice" } else { "bob" };
                tokio::spawn(async move {
                    manager
                        .can_perform_action(principal, ActionType::GET, FINANCE_OU)
                        .await
                })
            })
            .collect();

        for (i, check) in checks.into_iter().enumerate() {
            assert_eq!(check.await.unwrap().unwrap(), i % 2 == 0);
        }
    }
}
