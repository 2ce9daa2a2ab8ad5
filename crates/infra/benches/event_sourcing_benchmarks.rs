use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use seekyours_core::{AggregateId, AggregateRoot};
use seekyours_customers::Customer;
use seekyours_events::Aggregate;
use seekyours_infra::event_store::InMemoryEventStore;
use seekyours_infra::repository::AggregateRepository;

const HISTORY_SIZES: &[usize] = &[1, 10, 100, 1_000];

/// A customer with `changes` renames after creation, all still pending.
fn customer_with_changes(changes: usize) -> Customer {
    let mut customer = Customer::new();
    customer
        .create(AggregateId::new(), "Customer 0")
        .expect("create");
    for i in 1..=changes {
        customer.change(format!("Customer {i}")).expect("change");
    }
    customer
}

/// Store holding one customer stream of `1 + changes` events.
fn seeded_repository(changes: usize) -> (AggregateRepository<InMemoryEventStore>, AggregateId) {
    let repo = AggregateRepository::new(InMemoryEventStore::new());
    let mut customer = customer_with_changes(changes);
    let id = customer.id();
    repo.save(&mut customer).expect("save");
    (repo, id)
}

fn bench_state_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_derivation");

    for &size in HISTORY_SIZES {
        let customer = customer_with_changes(size);
        group.throughput(Throughput::Elements(customer.timeline().len() as u64));

        group.bench_with_input(BenchmarkId::new("name", size), &customer, |b, customer| {
            b.iter(|| black_box(customer.name()));
        });
        group.bench_with_input(BenchmarkId::new("id", size), &customer, |b, customer| {
            b.iter(|| black_box(customer.id()));
        });
    }

    group.finish();
}

fn bench_save_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_throughput");

    for &batch in &[1usize, 10, 100] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            let repo = AggregateRepository::new(InMemoryEventStore::new());
            let (_, subscription) = repo.subscribe_queue();
            b.iter_batched(
                || customer_with_changes(batch - 1),
                |mut customer| {
                    repo.save(&mut customer).expect("save");
                    black_box(subscription.drain().len())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_load_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_replay");

    for &size in HISTORY_SIZES {
        let (repo, id) = seeded_repository(size);
        group.throughput(Throughput::Elements(size as u64 + 1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &id, |b, &id| {
            b.iter(|| {
                let customer: Customer = repo.load(id).expect("load");
                black_box(customer.name().map(str::len))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_state_derivation,
    bench_save_throughput,
    bench_load_replay
);
criterion_main!(benches);
