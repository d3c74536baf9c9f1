//! imgboard Test Utilities
//!
//! Centralized test infrastructure for the imgboard workspace:
//! - Proptest generators for all entity types
//! - Test doubles for both stores
//! - Test fixtures for common scenarios
//! - Custom assertions for imgboard-specific results

// Re-export in-process stores from their source crate
pub use imgboard_storage::{InMemoryKvStore, MemorySource};

// Re-export core types for convenience
pub use imgboard_core::{
    Author, AuthorKey, Board, BoardKey, CacheConfig, CacheError, CacheResult, EntityType, Image,
    ImageKey, ImgboardError, ImgboardResult, NewPost, NewThread, Post, PostKey, StoreError,
    StoreResult, Thread, ThreadKey, Timestamp,
};

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use imgboard_storage::{KvStore, SourceOfTruth};

// ============================================================================
// TEST DOUBLES
// ============================================================================

/// Key-value store that is unreachable for every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableKvStore;

#[async_trait]
impl KvStore for UnreachableKvStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _value: &[u8]) -> CacheResult<()> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn incr(&self, _key: &str) -> CacheResult<i64> {
        Err(CacheError::unavailable("connection refused"))
    }
}

/// Source-of-truth wrapper that counts read calls and can be armed to panic.
///
/// Inserts are forwarded without being counted.
pub struct CountingSource<S> {
    inner: S,
    reads: AtomicUsize,
    /// Panic once `reads` would exceed this. `usize::MAX` when disarmed.
    limit: AtomicUsize,
}

impl<S: SourceOfTruth> CountingSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            limit: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of reads served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Panic on any read past the first `limit` ones.
    pub fn panic_after(&self, limit: usize) {
        self.limit.store(limit, Ordering::SeqCst);
    }

    fn record_read(&self, operation: &str) {
        let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        let limit = self.limit.load(Ordering::SeqCst);
        if n > limit {
            panic!(
                "source of truth hit by {} (read #{}, limit {})",
                operation, n, limit
            );
        }
    }
}

#[async_trait]
impl<S: SourceOfTruth> SourceOfTruth for CountingSource<S> {
    async fn board_list(&self) -> StoreResult<Vec<Board>> {
        self.record_read("board_list");
        self.inner.board_list().await
    }

    async fn board_get(&self, key: &BoardKey) -> StoreResult<Option<Board>> {
        self.record_read("board_get");
        self.inner.board_get(key).await
    }

    async fn thread_get(&self, key: ThreadKey) -> StoreResult<Option<Thread>> {
        self.record_read("thread_get");
        self.inner.thread_get(key).await
    }

    async fn threads_by_board(&self, board: &BoardKey) -> StoreResult<Vec<Thread>> {
        self.record_read("threads_by_board");
        self.inner.threads_by_board(board).await
    }

    async fn threads_by_author(&self, author: &AuthorKey) -> StoreResult<Vec<Thread>> {
        self.record_read("threads_by_author");
        self.inner.threads_by_author(author).await
    }

    async fn thread_insert(&self, thread: &NewThread) -> StoreResult<ThreadKey> {
        self.inner.thread_insert(thread).await
    }

    async fn post_get(&self, key: PostKey) -> StoreResult<Option<Post>> {
        self.record_read("post_get");
        self.inner.post_get(key).await
    }

    async fn posts_by_thread(&self, thread: ThreadKey) -> StoreResult<Vec<Post>> {
        self.record_read("posts_by_thread");
        self.inner.posts_by_thread(thread).await
    }

    async fn posts_by_author(&self, author: &AuthorKey) -> StoreResult<Vec<Post>> {
        self.record_read("posts_by_author");
        self.inner.posts_by_author(author).await
    }

    async fn post_insert(&self, post: &NewPost) -> StoreResult<PostKey> {
        self.inner.post_insert(post).await
    }

    async fn author_get(&self, key: &AuthorKey) -> StoreResult<Option<Author>> {
        self.record_read("author_get");
        self.inner.author_get(key).await
    }
}

/// Source of truth whose database is down: every call is `StoreError::Unavailable`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSource;

impl UnavailableSource {
    fn down<T>() -> StoreResult<T> {
        Err(StoreError::unavailable("database connection refused"))
    }
}

#[async_trait]
impl SourceOfTruth for UnavailableSource {
    async fn board_list(&self) -> StoreResult<Vec<Board>> {
        Self::down()
    }

    async fn board_get(&self, _key: &BoardKey) -> StoreResult<Option<Board>> {
        Self::down()
    }

    async fn thread_get(&self, _key: ThreadKey) -> StoreResult<Option<Thread>> {
        Self::down()
    }

    async fn threads_by_board(&self, _board: &BoardKey) -> StoreResult<Vec<Thread>> {
        Self::down()
    }

    async fn threads_by_author(&self, _author: &AuthorKey) -> StoreResult<Vec<Thread>> {
        Self::down()
    }

    async fn thread_insert(&self, _thread: &NewThread) -> StoreResult<ThreadKey> {
        Self::down()
    }

    async fn post_get(&self, _key: PostKey) -> StoreResult<Option<Post>> {
        Self::down()
    }

    async fn posts_by_thread(&self, _thread: ThreadKey) -> StoreResult<Vec<Post>> {
        Self::down()
    }

    async fn posts_by_author(&self, _author: &AuthorKey) -> StoreResult<Vec<Post>> {
        Self::down()
    }

    async fn post_insert(&self, _post: &NewPost) -> StoreResult<PostKey> {
        Self::down()
    }

    async fn author_get(&self, _key: &AuthorKey) -> StoreResult<Option<Author>> {
        Self::down()
    }
}

/// Install a test-writer subscriber. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("imgboard_storage=debug"))
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating imgboard entity types.

    use super::*;
    use proptest::prelude::*;

    // === Identity Type Generators ===

    /// Generate a board key like `a` or `tech`.
    pub fn arb_board_key() -> impl Strategy<Value = BoardKey> {
        "[a-z]{1,6}".prop_map(BoardKey)
    }

    /// Generate an author key.
    pub fn arb_author_key() -> impl Strategy<Value = AuthorKey> {
        "[a-zA-Z0-9]{1,12}".prop_map(AuthorKey)
    }

    pub fn arb_thread_key() -> impl Strategy<Value = ThreadKey> {
        (1i64..1_000_000).prop_map(ThreadKey)
    }

    pub fn arb_post_key() -> impl Strategy<Value = PostKey> {
        (1i64..1_000_000).prop_map(PostKey)
    }

    pub fn arb_image_key() -> impl Strategy<Value = ImageKey> {
        any::<[u8; 16]>().prop_map(|bytes| ImageKey(uuid::Uuid::from_bytes(bytes)))
    }

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // Generate timestamps within a reasonable range (2020-2030)
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(chrono::Utc::now)
        })
    }

    // === Entity Generators ===

    pub fn arb_board() -> impl Strategy<Value = Board> {
        (arb_board_key(), "[A-Za-z ]{1,24}").prop_map(|(key, name)| Board { key, name })
    }

    pub fn arb_author() -> impl Strategy<Value = Author> {
        (arb_author_key(), "[A-Za-z]{1,16}").prop_map(|(key, name)| Author { key, name })
    }

    pub fn arb_thread() -> impl Strategy<Value = Thread> {
        (
            arb_thread_key(),
            ".{0,64}",
            arb_author_key(),
            arb_board_key(),
            arb_timestamp(),
            proptest::option::of((arb_image_key(), "[a-z0-9/]{1,32}\\.png")),
        )
            .prop_map(|(key, title, author, board, created_at, image)| Thread {
                key,
                title,
                author,
                board,
                created_at,
                image: image.as_ref().map(|(k, _)| *k),
                image_path: image.map(|(_, path)| path),
            })
    }

    pub fn arb_post() -> impl Strategy<Value = Post> {
        (
            arb_post_key(),
            arb_author_key(),
            arb_thread_key(),
            arb_timestamp(),
            ".{0,256}",
        )
            .prop_map(|(key, author, thread, created_at, text)| Post {
                key,
                author,
                thread,
                created_at,
                text,
                image: None,
                image_path: None,
            })
    }

    /// Raw content strings, including ones with quotes and escapes.
    pub fn arb_content() -> impl Strategy<Value = String> {
        ".{0,512}"
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::Utc;

    pub fn make_board(key: &str, name: &str) -> Board {
        Board::new(key, name)
    }

    pub fn make_author(key: &str) -> Author {
        Author {
            key: AuthorKey::from(key),
            name: format!("{}-name", key),
        }
    }

    pub fn make_new_thread(board: &str, author: &str, title: &str) -> NewThread {
        NewThread {
            title: title.to_string(),
            author: AuthorKey::from(author),
            board: BoardKey::from(board),
            created_at: Utc::now(),
            image: None,
        }
    }

    pub fn make_new_post(thread: ThreadKey, author: &str, text: &str) -> NewPost {
        NewPost {
            author: AuthorKey::from(author),
            thread,
            created_at: Utc::now(),
            text: text.to_string(),
            image: None,
        }
    }

    /// Source holding board `a` ("Anime") and author `u1`.
    pub async fn anime_source() -> MemorySource {
        let source = MemorySource::new();
        source.add_board(make_board("a", "Anime")).await;
        source.add_author(make_author("u1")).await;
        source
    }

    /// Cache config with an isolated prefix.
    pub fn test_cache_config() -> CacheConfig {
        CacheConfig::default().with_prefix("test")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for imgboard results.

    use super::*;

    /// Assert that an ImgboardResult is a NotFound store error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(
        result: &ImgboardResult<T>,
        entity_type: EntityType,
    ) {
        match result {
            Err(ImgboardError::Store(StoreError::NotFound {
                entity_type: et, ..
            })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that an ImgboardResult is a store-unavailable error.
    ///
    /// A cache-unavailable error fails the assertion: those never reach callers.
    #[track_caller]
    pub fn assert_unavailable<T: std::fmt::Debug>(result: &ImgboardResult<T>) {
        match result {
            Err(e @ ImgboardError::Store(_)) if e.is_unavailable() => {}
            other => panic!("Expected unavailable error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
