use std::sync::Arc;

use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use imgboard_core::{AuthorKey, BoardKey, Thread, ThreadKey};
use imgboard_storage::{
    EntityCache, InMemoryKvStore, KeyLayout, Namespace, StatsRecorder, VersionedCache,
    VersionedContainer,
};
use std::hint::black_box;

fn bench_threads(count: i64) -> Vec<Thread> {
    (1..=count)
        .map(|i| Thread {
            key: ThreadKey(i),
            title: format!("thread {}", i),
            author: AuthorKey::from("u1"),
            board: BoardKey::from("a"),
            created_at: Utc::now(),
            image: None,
            image_path: None,
        })
        .collect()
}

fn bench_container(c: &mut Criterion) {
    let content = serde_json::to_string(&bench_threads(50)).expect("serialize threads");
    let container = VersionedContainer::new(42, content);
    let encoded = container.encode().expect("encode container");

    c.bench_function("container/encode", |b| {
        b.iter(|| black_box(container.encode().expect("encode")));
    });
    c.bench_function("container/decode", |b| {
        b.iter(|| black_box(VersionedContainer::decode(black_box(&encoded)).expect("decode")));
    });
}

fn bench_key_layout(c: &mut Criterion) {
    let layout = KeyLayout::new("imgboard");
    c.bench_function("layout/entry_key", |b| {
        b.iter(|| black_box(layout.entry_key(Namespace::ThreadByBoard, black_box("a"))));
    });
}

fn bench_read_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("build runtime");
    let cache = VersionedCache::new(Arc::new(InMemoryKvStore::new()), KeyLayout::new("bench"));
    let threads: EntityCache<_, Vec<Thread>> = EntityCache::new(
        cache,
        Namespace::ThreadByBoard,
        Arc::new(StatsRecorder::new()),
    );
    rt.block_on(threads.write("a", &bench_threads(50)))
        .expect("populate");

    c.bench_function("accessor/read_hit", |b| {
        b.iter(|| {
            let lookup = rt.block_on(threads.read(black_box("a"))).expect("read");
            black_box(lookup.is_hit());
        });
    });
}

criterion_group!(benches, bench_container, bench_key_layout, bench_read_hit);
criterion_main!(benches);
