use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use ledgerguard_core::{Amount, OperationName, SystemClock};
use ledgerguard_infra::{EngineConfig, Engines, InMemoryStore};
use tokio::runtime::Runtime;

/// Engines with DEPOSIT/TRANSFER limits high enough never to deny.
fn setup(rt: &Runtime) -> Engines<InMemoryStore> {
    let engines = Engines::in_memory(&EngineConfig::default(), Arc::new(SystemClock)).unwrap();
    rt.block_on(async {
        for name in ["DEPOSIT", "TRANSFER"] {
            let op = OperationName::new(name).unwrap();
            engines
                .registry()
                .register_operation_type(op.clone(), name)
                .await
                .unwrap();
            engines
                .registry()
                .register_limit(op, 1, Amount::from_units(u32::MAX), Amount::from_units(u32::MAX))
                .await
                .unwrap();
        }
    });
    engines
}

fn bench_single_operation_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engines = setup(&rt);
    let store = engines.store();
    let a = store.open_account(Amount::from_units(1_000_000), 1).unwrap();
    let b = store.open_account(Amount::ZERO, 1).unwrap();
    let deposit = OperationName::new("DEPOSIT").unwrap();

    let mut group = c.benchmark_group("single_operation_latency");

    group.bench_function("deposit", |bench| {
        bench.iter(|| {
            rt.block_on(engines.ledger().deposit(black_box(a.id), Amount::MINOR_UNIT))
                .unwrap()
        });
    });

    group.bench_function("transfer", |bench| {
        bench.iter(|| {
            rt.block_on(engines.ledger().transfer(black_box(a.id), b.id, Amount::MINOR_UNIT, None))
                .unwrap()
        });
    });

    group.bench_function("check_and_update", |bench| {
        bench.iter(|| {
            rt.block_on(
                engines
                    .limits()
                    .check_and_update(black_box(b.id), &deposit, Amount::MINOR_UNIT, 1),
            )
            .unwrap()
        });
    });

    group.finish();
}

fn bench_contended_deposits(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();
    let engines = Arc::new(setup(&rt));

    let mut group = c.benchmark_group("contended_deposits");

    for tasks in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(tasks as u64));

        // All tasks hit one account: serialized on its row lock.
        group.bench_with_input(BenchmarkId::new("same_account", tasks), &tasks, |bench, &tasks| {
            let id = engines.store().open_account(Amount::ZERO, 1).unwrap().id;
            bench.iter(|| {
                rt.block_on(async {
                    let handles: Vec<_> = (0..tasks)
                        .map(|_| {
                            let engines = Arc::clone(&engines);
                            tokio::spawn(async move { engines.ledger().deposit(id, Amount::MINOR_UNIT).await })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap().unwrap();
                    }
                })
            });
        });

        // One account per task: no shared rows.
        group.bench_with_input(BenchmarkId::new("distinct_accounts", tasks), &tasks, |bench, &tasks| {
            let accounts: Vec<_> = (0..tasks)
                .map(|_| engines.store().open_account(Amount::ZERO, 1).unwrap().id)
                .collect();
            bench.iter(|| {
                rt.block_on(async {
                    let handles: Vec<_> = accounts
                        .iter()
                        .map(|&id| {
                            let engines = Arc::clone(&engines);
                            tokio::spawn(async move { engines.ledger().deposit(id, Amount::MINOR_UNIT).await })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap().unwrap();
                    }
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_operation_latency, bench_contended_deposits);
criterion_main!(benches);
