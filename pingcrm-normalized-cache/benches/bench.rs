use criterion::{
    criterion_group, criterion_main, measurement::WallTime, BenchmarkGroup, BenchmarkId, Criterion,
    Throughput
};
use futures::{executor::block_on, future};
use pingcrm_normalized_cache::{Store, Tag, TagSet};

criterion_group!(benches, read, write, invalidate);
criterion_main!(benches);

pub fn read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");

    benchmark_reads(&mut group, 100);
    benchmark_reads(&mut group, 1000);
    benchmark_reads(&mut group, 10000);

    group.finish();
}

pub fn write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    benchmark_writes(&mut group, 100);
    benchmark_writes(&mut group, 1000);

    group.finish();
}

pub fn invalidate(c: &mut Criterion) {
    let mut group = c.benchmark_group("invalidate");

    benchmark_invalidation(&mut group, 100);
    benchmark_invalidation(&mut group, 1000);

    group.finish();
}

fn contact_tags(i: u64) -> TagSet {
    vec![Tag::entity("contacts", i.to_string()), Tag::list("contacts")]
        .into_iter()
        .collect()
}

fn fill(store: &Store<String, ()>, n: u64) {
    for i in 0..n {
        block_on(store.fetch_or_serve(
            i,
            contact_tags(i),
            |_| contact_tags(i),
            || future::ready(Ok(format!("contact {}", i)))
        ))
        .unwrap();
    }
}

fn benchmark_reads(group: &mut BenchmarkGroup<WallTime>, n: u64) {
    let store = Store::default();
    fill(&store, n);

    group.throughput(Throughput::Elements(n));
    group.sample_size(usize::max(10, 10000 / n as usize));
    group.bench_with_input(
        BenchmarkId::new("fresh hits", format!("{} entries", n)),
        &n,
        |b, n| {
            b.iter(|| {
                for i in 0..*n {
                    store.get(i).unwrap();
                }
            });
        }
    );
}

fn benchmark_writes(group: &mut BenchmarkGroup<WallTime>, n: u64) {
    let store = Store::default();

    group.throughput(Throughput::Elements(n));
    group.sample_size(usize::max(10, 10000 / n as usize));
    group.bench_with_input(
        BenchmarkId::new("refetch", format!("{} entries", n)),
        &n,
        |b, n| {
            b.iter(|| {
                for i in 0..*n {
                    block_on(store.refetch(
                        i,
                        contact_tags(i),
                        |_| contact_tags(i),
                        || future::ready(Ok::<_, ()>(format!("contact {}", i)))
                    ))
                    .unwrap();
                }
            });
        }
    );
}

fn benchmark_invalidation(group: &mut BenchmarkGroup<WallTime>, n: u64) {
    let list: TagSet = vec![Tag::list("contacts")].into_iter().collect();

    group.throughput(Throughput::Elements(n));
    group.sample_size(10);
    group.bench_with_input(
        BenchmarkId::new("list tag", format!("{} entries", n)),
        &n,
        |b, n| {
            b.iter_with_setup(
                || {
                    let store = Store::default();
                    fill(&store, *n);
                    for i in (0..*n).step_by(2) {
                        store.subscribe(i);
                    }
                    store
                },
                |store| store.invalidate(&list)
            );
        }
    );
}
