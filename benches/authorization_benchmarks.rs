//! Authorization path benchmarks
//!
//! Catalog loading, effective-rights folding, end-to-end access checks over
//! the in-memory directory and batch fan-out.

use adacl::config::{DispatchConfig, RoleManagerConfig};
use adacl::directory::{DirectoryEntryRecord, DirectorySnapshot, InMemoryDirectoryStore};
use adacl::dispatch::{AdObject, BatchDispatcher, BatchRequest};
use adacl::security::acl::{AccessRuleEntry, DirectoryRights, RightsAggregator};
use adacl::security::roles::{
    ActionType, CatalogOptions, DaclRoleManager, RoleCatalog, RoleDefinition, RoleManagerTrait,
};
use adacl::types::{IdentityRef, ObjectKind};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const TARGET: &str = "OU=Bench,DC=corp,DC=local";

fn role_chain(length: usize) -> Vec<RoleDefinition> {
    let actions: Vec<ActionType> = ActionType::each().collect();
    (0..length)
        .map(|i| {
            let role = RoleDefinition::new(format!("Role{}", i))
                .with_actions(actions[i % actions.len()])
                .with_rights(DirectoryRights::READ_PROPERTY);
            if i == 0 {
                role
            } else {
                role.extends(format!("Role{}", i - 1))
            }
        })
        .collect()
}

/// One user nested `depth` groups deep, the outermost group holding
/// GenericAll on the target among `noise` unrelated entries
fn nested_directory(depth: usize, noise: usize) -> DirectorySnapshot {
    let mut user = DirectoryEntryRecord::user("S-1-5-21-9-1", "bench", "CN=bench,DC=corp,DC=local");
    if depth > 0 {
        user = user.member_of("Group0");
    }
    let mut snapshot = DirectorySnapshot::new().with_entry(user);

    for level in 0..depth {
        let mut group = DirectoryEntryRecord::group(
            &format!("S-1-5-21-9-{}", 1000 + level),
            &format!("Group{}", level),
            &format!("CN=Group{},DC=corp,DC=local", level),
        );
        if level + 1 < depth {
            group = group.member_of(format!("Group{}", level + 1));
        }
        snapshot = snapshot.with_entry(group);
    }

    let mut ou = DirectoryEntryRecord::organizational_unit("Bench", TARGET);
    for i in 0..noise {
        ou = ou.with_rule(AccessRuleEntry::allow(
            format!("S-1-5-21-9-{}", 50_000 + i),
            DirectoryRights::GENERIC_READ,
        ));
    }
    let top = if depth > 0 {
        format!("S-1-5-21-9-{}", 1000 + depth - 1)
    } else {
        "S-1-5-21-9-1".to_string()
    };
    snapshot.with_entry(ou.with_rule(AccessRuleEntry::allow(top, DirectoryRights::GENERIC_ALL)))
}

fn standard_config() -> RoleManagerConfig {
    RoleManagerConfig {
        roles: vec![
            RoleDefinition::new("Reader")
                .with_actions(ActionType::GET)
                .with_rights(DirectoryRights::GENERIC_READ),
            RoleDefinition::new("Writer")
                .with_actions(ActionType::MODIFY)
                .with_rights(DirectoryRights::GENERIC_READ | DirectoryRights::GENERIC_WRITE)
                .extends("Reader"),
            RoleDefinition::new("AccessManager")
                .with_actions(ActionType::ADD_ACCESS_RULE | ActionType::ADD_ROLE)
                .with_rights(DirectoryRights::GENERIC_ALL)
                .extends("Writer"),
        ],
        ..Default::default()
    }
}

fn setup_manager(depth: usize, noise: usize) -> Arc<DaclRoleManager> {
    let directory = Arc::new(InMemoryDirectoryStore::new(nested_directory(depth, noise)).unwrap());
    Arc::new(DaclRoleManager::new(&standard_config(), directory).unwrap())
}

fn catalog_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_load");

    for length in [8, 64, 256].iter() {
        let definitions = role_chain(*length);
        group.throughput(Throughput::Elements(*length as u64));
        group.bench_with_input(BenchmarkId::new("chain", length), &definitions, |b, defs| {
            b.iter(|| black_box(RoleCatalog::load(defs, CatalogOptions::default()).unwrap()))
        });
    }

    group.finish();
}

fn aggregation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("effective_rights");
    let aggregator = RightsAggregator::default();

    for rules in [10, 100, 1000].iter() {
        let entries: Vec<AccessRuleEntry> = (0..*rules)
            .map(|i| AccessRuleEntry::allow(format!("S-{}", i), DirectoryRights::READ_PROPERTY))
            .collect();
        let closure: HashSet<IdentityRef> = (0..*rules)
            .step_by(7)
            .map(|i| Arc::from(format!("S-{}", i)))
            .collect();

        group.throughput(Throughput::Elements(*rules as u64));
        group.bench_with_input(BenchmarkId::new("rules", rules), &entries, |b, entries| {
            b.iter(|| black_box(aggregator.effective_rights(&closure, entries)))
        });
    }

    group.finish();
}

fn access_check_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("can_perform_action");
    group.measurement_time(Duration::from_secs(5));
    let rt = Runtime::new().unwrap();

    for depth in [0, 4, 16].iter() {
        let manager = setup_manager(*depth, 50);
        group.bench_with_input(BenchmarkId::new("group_depth", depth), depth, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(
                        manager
                            .can_perform_action("bench", ActionType::MODIFY, TARGET)
                            .await
                            .unwrap(),
                    )
                })
            })
        });
    }

    // No role grants Delete, so this never reaches the directory
    let manager = setup_manager(4, 50);
    group.bench_function("no_candidate_roles", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(
                    manager
                        .can_perform_action("bench", ActionType::DELETE, TARGET)
                        .await
                        .unwrap(),
                )
            })
        })
    });

    group.finish();
}

fn batch_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_dispatch");
    let rt = Runtime::new().unwrap();
    let manager = setup_manager(4, 50);

    let mut request = BatchRequest::new(ActionType::GET);
    for _ in 0..64 {
        request = request.with_object(AdObject::new(ObjectKind::OrganizationalUnit, TARGET));
    }
    group.throughput(Throughput::Elements(request.objects.len() as u64));

    for (name, run_sequential) in [("sequential", true), ("parallel", false)] {
        let dispatcher = BatchDispatcher::new(
            manager.clone(),
            manager.directory().clone(),
            DispatchConfig {
                run_sequential,
                ..Default::default()
            },
        );
        group.bench_function(name, |b| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(dispatcher.execute("bench", request.clone()).await.unwrap())
                })
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    catalog_benchmarks,
    aggregation_benchmarks,
    access_check_benchmarks,
    batch_benchmarks
);
criterion_main!(benches);
