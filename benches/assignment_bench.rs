//! Auto-assignment and workload throughput over a seeded in-memory store.
//!
//! ```bash
//! cargo bench --bench assignment_bench
//! ```

use std::sync::Arc;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use wildguard_core::assignment::AutoAssignRequest;
use wildguard_core::storage::{
    AccountStatus, Case, CaseStatus, Investigation, Location, Priority, ReporterInfo, Role,
    ThreatType, UserRecord,
};
use wildguard_core::{Desk, DocumentStore, MemoryStore};

const OFFICERS: usize = 50;
const CASES_PER_OFFICER: usize = 8;

fn case(id: String, officer: Option<String>, status: CaseStatus) -> Case {
    let now = Utc::now();
    Case {
        case_id: id.clone(),
        report_id: format!("TR-{}", id),
        threat_type: ThreatType::Poaching,
        location: Location {
            lat: 6.4,
            lng: 81.5,
            address: "Yala block 1".to_string(),
        },
        reporter: ReporterInfo::default(),
        date_time: now,
        priority: Priority::High,
        status,
        assigned_officer: officer,
        assigned_team: None,
        investigation: Investigation::default(),
        resolution: None,
        created_at: now,
        updated_at: now,
    }
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.put_user(UserRecord {
        id: "adm-0".to_string(),
        name: "Desk admin".to_string(),
        email: "adm-0@wildguard.example".to_string(),
        phone: None,
        role: Role::Admin,
        status: AccountStatus::Active,
    });
    for i in 0..OFFICERS {
        let id = format!("off-{:03}", i);
        store.put_user(UserRecord {
            id: id.clone(),
            name: id.clone(),
            email: format!("{}@wildguard.example", id),
            phone: None,
            role: Role::Officer,
            status: AccountStatus::Active,
        });
        for n in 0..(i % CASES_PER_OFFICER) {
            store
                .insert_case(case(format!("CS-{}-{}", i, n), Some(id.clone()), CaseStatus::InProgress))
                .expect("seed case");
        }
    }
    store
        .insert_case(case("CS-TARGET".to_string(), None, CaseStatus::New))
        .expect("seed target");
    store
}

fn bench_auto_assign(c: &mut Criterion) {
    c.bench_function("auto_assign_officer", |b| {
        b.iter_batched(
            || Desk::with_defaults(Arc::new(seeded_store())),
            |desk| {
                let admin = desk.context(Some("adm-0")).expect("admin");
                let outcome = desk
                    .auto_assign(&admin, "CS-TARGET", &AutoAssignRequest::officer())
                    .expect("assign");
                black_box(outcome);
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_workload(c: &mut Criterion) {
    let desk = Desk::with_defaults(Arc::new(seeded_store()));
    let admin = desk.context(Some("adm-0")).expect("admin");
    c.bench_function("workload_view", |b| {
        b.iter(|| black_box(desk.workload(&admin).expect("workload")))
    });
}

criterion_group!(benches, bench_auto_assign, bench_workload);
criterion_main!(benches);
