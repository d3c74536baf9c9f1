//! End-to-end behavior of the cache-aside layer over in-process stores.

use std::sync::Arc;

use imgboard_storage::{
    CacheLookup, CachedRepository, EntityCache, InMemoryKvStore, KeyLayout, KvStore, MissReason,
    Namespace, SourceOfTruth, StatsRecorder, VersionedCache, VersionedContainer,
};
use imgboard_test_utils::{
    assertions, fixtures, generators, init_test_tracing, Author, Board, BoardKey, CountingSource,
    EntityType, MemorySource, Post, PostKey, Thread, ThreadKey, UnavailableSource,
    UnreachableKvStore,
};
use proptest::prelude::*;
use tokio::runtime::Runtime;

fn repo<K: KvStore + 'static>(
    source: Arc<CountingSource<MemorySource>>,
    store: Arc<K>,
) -> CachedRepository<CountingSource<MemorySource>, K> {
    CachedRepository::new(source, store, fixtures::test_cache_config())
        .expect("test config is valid")
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn board_list_second_read_skips_source() {
    init_test_tracing();
    let source = Arc::new(CountingSource::new(fixtures::anime_source().await));
    let repo = repo(Arc::clone(&source), Arc::new(InMemoryKvStore::new()));

    let first = repo.get_board_list().await.unwrap();
    assert_eq!(first, vec![Board::new("a", "Anime")]);
    repo.wait_idle().await;

    // Any further source read panics.
    source.panic_after(1);
    let second = repo.get_board_list().await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn inserted_thread_misses_once_then_hits() {
    let source = Arc::new(CountingSource::new(fixtures::anime_source().await));
    let repo = repo(Arc::clone(&source), Arc::new(InMemoryKvStore::new()));

    // Pad the sequence so the generated key is 42. Inserts are not counted.
    for _ in 0..41 {
        source
            .thread_insert(&fixtures::make_new_thread("a", "u1", "filler"))
            .await
            .unwrap();
    }
    let key = repo
        .put_thread(&fixtures::make_new_thread("a", "u1", "T"))
        .await
        .unwrap();
    assert_eq!(key, ThreadKey(42));
    repo.wait_idle().await;

    let thread = repo.get_thread(key).await.unwrap();
    assert_eq!(thread.title, "T");
    assert_eq!(source.reads(), 1);
    assert_eq!(repo.stats().misses, 1);
    repo.wait_idle().await;

    source.panic_after(1);
    assert_eq!(repo.get_thread(key).await.unwrap(), thread);
    assert_eq!(repo.stats().hits, 1);
}

#[tokio::test]
async fn external_counter_bump_makes_present_entry_stale() {
    let store = Arc::new(InMemoryKvStore::new());
    let layout = KeyLayout::new("test");
    let cache = VersionedCache::new(Arc::clone(&store), layout.clone());

    let thread = Thread {
        key: ThreadKey(1),
        title: "T".to_string(),
        author: "u1".into(),
        board: "a".into(),
        created_at: chrono::Utc::now(),
        image: None,
        image_path: None,
    };
    let content = serde_json::to_string(&[thread]).expect("threads serialize");

    // Stamp the entry at version 3.
    for _ in 0..2 {
        cache.invalidate_namespace(Namespace::ThreadByBoard).await.unwrap();
    }
    assert_eq!(
        cache.write(Namespace::ThreadByBoard, "a", &content).await.unwrap(),
        Some(3)
    );

    // A concurrent writer bumps the counter to 4.
    assert_eq!(
        store.incr(&layout.counter_key(Namespace::ThreadByBoard)).await.unwrap(),
        4
    );

    let lookup = cache.read(Namespace::ThreadByBoard, "a").await.unwrap();
    assert_eq!(
        lookup,
        CacheLookup::Miss(MissReason::Stale {
            version: 3,
            counter: 4
        })
    );

    let raw = store
        .get(&layout.entry_key(Namespace::ThreadByBoard, "a"))
        .await
        .unwrap()
        .expect("entry bytes are still present");
    assert_eq!(VersionedContainer::decode(&raw).unwrap().version, 3);
}

#[tokio::test]
async fn unreachable_cache_serves_source_data() {
    let source = Arc::new(CountingSource::new(fixtures::anime_source().await));
    let repo = repo(Arc::clone(&source), Arc::new(UnreachableKvStore));

    assert_eq!(repo.get_board_list().await.unwrap().len(), 1);
    assert_eq!(repo.get_board(&BoardKey::from("a")).await.unwrap().name, "Anime");

    let thread = repo
        .put_thread(&fixtures::make_new_thread("a", "u1", "T"))
        .await
        .unwrap();
    let post = repo
        .put_post(&fixtures::make_new_post(thread, "u1", "hello"))
        .await
        .unwrap();

    assert_eq!(repo.get_thread(thread).await.unwrap().title, "T");
    assert_eq!(repo.get_threads_by_board(&BoardKey::from("a")).await.unwrap().len(), 1);
    assert_eq!(repo.get_threads_by_author(&"u1".into()).await.unwrap().len(), 1);
    assert_eq!(repo.get_post(post).await.unwrap().text, "hello");
    assert_eq!(repo.get_posts_by_thread(thread).await.unwrap().len(), 1);
    assert_eq!(repo.get_posts_by_author(&"u1".into()).await.unwrap().len(), 1);
    assert_eq!(repo.get_author(&"u1".into()).await.unwrap().key.as_str(), "u1");
    repo.wait_idle().await;

    // Every read went to the source; every invalidation was contained.
    assert_eq!(source.reads(), 9);
    let stats = repo.stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.cache_errors, 9);
    assert_eq!(stats.invalidation_failures, 6);
}

#[tokio::test]
async fn missing_entities_surface_not_found() {
    let source = Arc::new(CountingSource::new(fixtures::anime_source().await));
    let repo = repo(source, Arc::new(InMemoryKvStore::new()));

    assertions::assert_not_found(&repo.get_board(&"zz".into()).await, EntityType::Board);
    assertions::assert_not_found(&repo.get_thread(ThreadKey(9)).await, EntityType::Thread);
    assertions::assert_not_found(
        &repo.get_threads_by_board(&"a".into()).await,
        EntityType::Thread,
    );
    assertions::assert_not_found(&repo.get_posts_by_thread(ThreadKey(9)).await, EntityType::Post);
    assertions::assert_not_found(&repo.get_author(&"ghost".into()).await, EntityType::Author);
}

#[tokio::test]
async fn unavailable_source_surfaces_and_writes_nothing() {
    let store = Arc::new(InMemoryKvStore::new());
    let repo = CachedRepository::new(
        Arc::new(UnavailableSource),
        Arc::clone(&store),
        fixtures::test_cache_config(),
    )
    .expect("test config is valid");

    assertions::assert_unavailable(&repo.get_board_list().await);
    assertions::assert_unavailable(&repo.get_board(&"a".into()).await);
    assertions::assert_unavailable(&repo.get_threads_by_board(&"a".into()).await);
    assertions::assert_unavailable(&repo.get_post(PostKey(1)).await);
    assertions::assert_unavailable(
        &repo
            .put_thread(&fixtures::make_new_thread("a", "u1", "T"))
            .await,
    );
    assertions::assert_unavailable(
        &repo
            .put_post(&fixtures::make_new_post(ThreadKey(1), "u1", "hi"))
            .await,
    );

    // Nothing to populate and nothing to invalidate.
    assert_eq!(repo.pending_tasks(), 0);
    repo.wait_idle().await;
    assert!(store.is_empty().await);

    let stats = repo.stats();
    assert_eq!(stats.misses, 4);
    assert_eq!(stats.populate_failures, 0);
    assert_eq!(stats.invalidation_failures, 0);
}

#[tokio::test]
async fn failed_insert_leaves_counters_and_entries_alone() {
    let store = Arc::new(InMemoryKvStore::new());
    let layout = KeyLayout::new("test");
    let cache = VersionedCache::new(Arc::clone(&store), layout.clone());
    cache
        .write(Namespace::ThreadByBoard, "a", "[]")
        .await
        .unwrap();
    cache.write(Namespace::PostByKey, "1", "{}").await.unwrap();
    let before = (
        store.get(&layout.counter_key(Namespace::ThreadByBoard)).await.unwrap(),
        store.get(&layout.counter_key(Namespace::PostByKey)).await.unwrap(),
        store.len().await,
    );

    let repo = CachedRepository::new(
        Arc::new(UnavailableSource),
        Arc::clone(&store),
        fixtures::test_cache_config(),
    )
    .expect("test config is valid");
    assertions::assert_unavailable(
        &repo
            .put_thread(&fixtures::make_new_thread("a", "u1", "T"))
            .await,
    );
    assertions::assert_unavailable(
        &repo
            .put_post(&fixtures::make_new_post(ThreadKey(1), "u1", "hi"))
            .await,
    );
    repo.wait_idle().await;

    let after = (
        store.get(&layout.counter_key(Namespace::ThreadByBoard)).await.unwrap(),
        store.get(&layout.counter_key(Namespace::PostByKey)).await.unwrap(),
        store.len().await,
    );
    assert_eq!(after, before);
    assert!(cache.read(Namespace::ThreadByBoard, "a").await.unwrap().is_hit());
    assert!(cache.read(Namespace::PostByKey, "1").await.unwrap().is_hit());
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn test_runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn fresh_cache() -> VersionedCache<InMemoryKvStore> {
    VersionedCache::new(Arc::new(InMemoryKvStore::new()), KeyLayout::new("test"))
}

/// Entity keys as they appear in store keys: board and author names, numeric ids.
fn arb_entity_key() -> impl Strategy<Value = String> {
    prop_oneof![
        generators::arb_board_key().prop_map(|k| k.to_string()),
        generators::arb_author_key().prop_map(|k| k.to_string()),
        generators::arb_thread_key().prop_map(|k| k.to_string()),
        generators::arb_post_key().prop_map(|k| k.to_string()),
    ]
}

fn arb_namespace() -> impl Strategy<Value = Namespace> {
    proptest::sample::select(Namespace::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any content written under any namespace and key reads back unchanged
    /// while nothing else touches the namespace.
    #[test]
    fn prop_raw_write_then_read_round_trips(
        namespace in arb_namespace(),
        key in arb_entity_key(),
        content in generators::arb_content(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let cache = fresh_cache();
            let version = cache.write(namespace, &key, &content).await?;
            prop_assert!(version.is_some());

            let lookup = cache.read(namespace, &key).await?;
            prop_assert_eq!(lookup, CacheLookup::Hit(content.clone()));
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Every entity kind survives a typed write followed by a typed read.
    #[test]
    fn prop_typed_write_then_read_round_trips(
        board in generators::arb_board(),
        author in generators::arb_author(),
        threads in prop::collection::vec(generators::arb_thread(), 1..6),
        post in generators::arb_post(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let cache = fresh_cache();
            let stats = Arc::new(StatsRecorder::new());

            let boards: EntityCache<_, Board> =
                EntityCache::new(cache.clone(), Namespace::BoardByKey, Arc::clone(&stats));
            boards.write(board.key.as_str(), &board).await?;
            let lookup = boards.read(board.key.as_str()).await?;
            prop_assert_eq!(lookup, CacheLookup::Hit(board.clone()));

            let authors: EntityCache<_, Author> =
                EntityCache::new(cache.clone(), Namespace::AuthorByKey, Arc::clone(&stats));
            authors.write(author.key.as_str(), &author).await?;
            let lookup = authors.read(author.key.as_str()).await?;
            prop_assert_eq!(lookup, CacheLookup::Hit(author.clone()));

            let thread = threads[0].clone();
            let by_key: EntityCache<_, Thread> =
                EntityCache::new(cache.clone(), Namespace::ThreadByKey, Arc::clone(&stats));
            let key = thread.key.to_string();
            by_key.write(&key, &thread).await?;
            prop_assert_eq!(by_key.read(&key).await?, CacheLookup::Hit(thread.clone()));

            let by_board: EntityCache<_, Vec<Thread>> =
                EntityCache::new(cache.clone(), Namespace::ThreadByBoard, Arc::clone(&stats));
            let key = thread.board.to_string();
            by_board.write(&key, &threads).await?;
            prop_assert_eq!(by_board.read(&key).await?, CacheLookup::Hit(threads.clone()));

            let posts: EntityCache<_, Post> =
                EntityCache::new(cache, Namespace::PostByKey, Arc::clone(&stats));
            let key = post.key.to_string();
            posts.write(&key, &post).await?;
            prop_assert_eq!(posts.read(&key).await?, CacheLookup::Hit(post.clone()));

            let snapshot = stats.snapshot();
            prop_assert_eq!(snapshot.hits, 5);
            prop_assert_eq!(snapshot.misses, 0);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// After invalidation every previously written key misses until it is
    /// written again, and only the rewritten key hits.
    #[test]
    fn prop_invalidation_misses_every_key_until_next_write(
        namespace in arb_namespace(),
        keys in prop::collection::hash_set(arb_entity_key(), 1..10),
        content in generators::arb_content(),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let rt = test_runtime()?;
        rt.block_on(async {
            let cache = fresh_cache();
            for key in &keys {
                cache.write(namespace, key, &content).await?;
            }
            cache.invalidate_namespace(namespace).await?;

            for key in &keys {
                let lookup = cache.read(namespace, key).await?;
                prop_assert!(lookup.is_miss(), "{} should miss after invalidation", key);
            }

            let rewritten = &keys[0];
            cache.write(namespace, rewritten, &content).await?;
            for key in &keys {
                let lookup = cache.read(namespace, key).await?;
                prop_assert_eq!(lookup.is_hit(), key == rewritten, "key {}", key);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_populations_leave_at_least_one_miss() {
    for _ in 0..20 {
        let store = Arc::new(InMemoryKvStore::new());
        let cache = VersionedCache::new(store, KeyLayout::new("test"));
        let stats = Arc::new(StatsRecorder::new());
        let boards: EntityCache<_, Board> =
            EntityCache::new(cache, Namespace::BoardByKey, Arc::clone(&stats));

        let p1 = {
            let boards = boards.clone();
            tokio::spawn(async move { boards.write("k1", &Board::new("k1", "One")).await })
        };
        let p2 = {
            let boards = boards.clone();
            tokio::spawn(async move { boards.write("k2", &Board::new("k2", "Two")).await })
        };
        p1.await.unwrap().unwrap();
        p2.await.unwrap().unwrap();

        let r1 = boards.read("k1").await.unwrap();
        let r2 = boards.read("k2").await.unwrap();
        // Coarse invalidation: whichever population minted the lower version
        // is behind the counter.
        assert!(r1.is_miss() || r2.is_miss());
        assert_eq!(stats.snapshot().stale, 1);
    }
}

#[tokio::test]
async fn insert_invalidates_only_its_family() {
    let source = Arc::new(CountingSource::new(fixtures::anime_source().await));
    let repo = repo(Arc::clone(&source), Arc::new(InMemoryKvStore::new()));

    repo.get_board(&"a".into()).await.unwrap();
    repo.get_author(&"u1".into()).await.unwrap();
    repo.wait_idle().await;

    let thread = repo
        .put_thread(&fixtures::make_new_thread("a", "u1", "T"))
        .await
        .unwrap();
    repo.put_post(&fixtures::make_new_post(thread, "u1", "hi"))
        .await
        .unwrap();
    repo.wait_idle().await;

    let reads_before = source.reads();
    repo.get_board(&"a".into()).await.unwrap();
    repo.get_author(&"u1".into()).await.unwrap();
    assert_eq!(source.reads(), reads_before);
}
