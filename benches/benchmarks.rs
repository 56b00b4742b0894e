use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use storehouse::{bind, field, Binding, Store, StoreRegistry};

#[derive(Clone)]
struct State {
    counter: usize,
    name: String,
}

fn state() -> State {
    State {
        counter: 0,
        name: "test".to_string(),
    }
}

fn store_creation_benchmark(c: &mut Criterion) {
    c.bench_function("store_creation", |b| {
        b.iter(|| {
            let store: Store<i32> = Store::new(black_box(42));
            store
        });
    });
}

fn store_read_benchmark(c: &mut Criterion) {
    let store = Store::new(state());

    c.bench_function("store_read", |b| {
        b.iter(|| {
            black_box(store.read(|state| state.counter));
        });
    });
}

fn store_update_benchmark(c: &mut Criterion) {
    let store = Store::new(state());

    c.bench_function("store_update", |b| {
        let mut i = 0;
        b.iter(|| {
            store.update(|state| {
                state.counter = black_box(i);
            });
            i += 1;
        });
    });
}

fn store_subscribe_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_subscribe");

    for subscriber_count in [1, 10, 100].iter() {
        let store = Store::new(state());

        let _subscriptions: Vec<_> = (0..*subscriber_count)
            .map(|_| {
                store.subscribe(|_| {
                    // Empty subscriber
                })
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(subscriber_count),
            subscriber_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    store.update(|state| state.counter = black_box(i));
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

fn binding_fanout_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("binding_fanout");

    for binding_count in [1, 10, 100].iter() {
        let store = Store::new(state());
        let counter = bind(&store, field!(State, counter));
        let _names: Vec<Binding<State, String>> = (0..*binding_count)
            .map(|_| bind(&store, field!(State, name)))
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(binding_count),
            binding_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    counter.set(black_box(i));
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

fn registry_hit_benchmark(c: &mut Criterion) {
    let registry = StoreRegistry::new();
    registry.create_or_get("app", state()).unwrap();

    c.bench_function("registry_hit", |b| {
        b.iter(|| {
            black_box(registry.get_or_create::<State>(black_box("app"), None).unwrap());
        });
    });
}

criterion_group!(
    benches,
    store_creation_benchmark,
    store_read_benchmark,
    store_update_benchmark,
    store_subscribe_benchmark,
    binding_fanout_benchmark,
    registry_hit_benchmark,
);
criterion_main!(benches);
