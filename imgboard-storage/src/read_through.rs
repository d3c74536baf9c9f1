//! Read-through model layer.
//!
//! [`CachedRepository`] is what page handlers and resolvers call. Reads try
//! the cache, fall back to the source of truth on any miss, and schedule a
//! background population. Inserts go to the source of truth first and then
//! invalidate the namespaces that could hold derivations of the new row.
//!
//! Callers only ever see domain values, `NotFound`, or a store error. Cache
//! failures are logged and the layer keeps answering from the source.

use std::future::Future;
use std::sync::Arc;

use imgboard_core::{
    Author, AuthorKey, Board, BoardKey, CacheConfig, ImgboardResult, NewPost, NewThread, Post,
    PostKey, StoreError, StoreResult, Thread, ThreadKey,
};
use tracing::{debug, warn};

use crate::cache::{
    CacheLookup, CacheStats, CacheableEntity, EntityCache, KeyLayout, KvStore, Namespace,
    Populator, StatsRecorder, TaskKind, VersionedCache,
};
use crate::source::SourceOfTruth;

/// Entity key of the single board-list entry.
const BOARD_LIST_KEY: &str = "";

/// One typed accessor per namespace.
struct Caches<K: KvStore> {
    raw: VersionedCache<K>,
    board_list: EntityCache<K, Vec<Board>>,
    board_by_key: EntityCache<K, Board>,
    thread_by_board: EntityCache<K, Vec<Thread>>,
    thread_by_author: EntityCache<K, Vec<Thread>>,
    thread_by_key: EntityCache<K, Thread>,
    post_by_thread: EntityCache<K, Vec<Post>>,
    post_by_author: EntityCache<K, Vec<Post>>,
    post_by_key: EntityCache<K, Post>,
    author_by_key: EntityCache<K, Author>,
}

impl<K: KvStore> Caches<K> {
    fn new(store: Arc<K>, layout: KeyLayout, stats: &Arc<StatsRecorder>) -> Self {
        let raw = VersionedCache::new(store, layout);
        let share = || Arc::clone(stats);
        Self {
            board_list: EntityCache::new(raw.clone(), Namespace::BoardList, share()),
            board_by_key: EntityCache::new(raw.clone(), Namespace::BoardByKey, share()),
            thread_by_board: EntityCache::new(raw.clone(), Namespace::ThreadByBoard, share()),
            thread_by_author: EntityCache::new(raw.clone(), Namespace::ThreadByAuthor, share()),
            thread_by_key: EntityCache::new(raw.clone(), Namespace::ThreadByKey, share()),
            post_by_thread: EntityCache::new(raw.clone(), Namespace::PostByThread, share()),
            post_by_author: EntityCache::new(raw.clone(), Namespace::PostByAuthor, share()),
            post_by_key: EntityCache::new(raw.clone(), Namespace::PostByKey, share()),
            author_by_key: EntityCache::new(raw.clone(), Namespace::AuthorByKey, share()),
            raw,
        }
    }
}

/// Cache-aside repository over a source of truth and a key-value store.
///
/// # Type Parameters
///
/// - `S`: the source of truth (relational store)
/// - `K`: the key-value store holding versioned entries and counters
///
/// # Example
///
/// ```ignore
/// let repo = CachedRepository::new(source, Arc::new(redis), CacheConfig::from_env())?;
///
/// let threads = repo.get_threads_by_board(&BoardKey::from("a")).await?;
/// let key = repo.put_thread(&new_thread).await?;
/// ```
pub struct CachedRepository<S: SourceOfTruth, K: KvStore> {
    source: Arc<S>,
    /// `None` when caching is disabled.
    caches: Option<Caches<K>>,
    populator: Populator,
    stats: Arc<StatsRecorder>,
    config: CacheConfig,
}

impl<S, K> CachedRepository<S, K>
where
    S: SourceOfTruth + 'static,
    K: KvStore + 'static,
{
    /// Create a repository. Fails if `config` does not validate.
    pub fn new(source: Arc<S>, store: Arc<K>, config: CacheConfig) -> ImgboardResult<Self> {
        config.validate()?;

        let stats = Arc::new(StatsRecorder::new());
        let caches = config.enabled.then(|| {
            Caches::new(store, KeyLayout::new(config.key_prefix.clone()), &stats)
        });
        let populator = Populator::new(config.populate_concurrency, Arc::clone(&stats));

        if !config.enabled {
            debug!("Cache disabled; reads go straight to the source of truth");
        }

        Ok(Self {
            source,
            caches,
            populator,
            stats,
            config,
        })
    }

    /// Create a repository with the default configuration.
    pub fn with_defaults(source: Arc<S>, store: Arc<K>) -> ImgboardResult<Self> {
        Self::new(source, store, CacheConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the source of truth.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Snapshot of cache usage counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Background tasks not yet finished.
    pub fn pending_tasks(&self) -> usize {
        self.populator.in_flight()
    }

    /// Wait for every scheduled population and invalidation to finish.
    #[cfg(any(test, feature = "testing"))]
    pub async fn wait_idle(&self) {
        self.populator.wait_idle().await;
    }

    // ------------------------------------------------------------------------
    // Boards
    // ------------------------------------------------------------------------

    /// All boards. An empty list is a valid answer and is cached.
    pub async fn get_board_list(&self) -> ImgboardResult<Vec<Board>> {
        let cache = self.caches.as_ref().map(|c| &c.board_list);
        let fetch = async { self.source.board_list().await.map(Some) };
        self.read_through(cache, BOARD_LIST_KEY.to_string(), fetch)
            .await
    }

    pub async fn get_board(&self, key: &BoardKey) -> ImgboardResult<Board> {
        let cache = self.caches.as_ref().map(|c| &c.board_by_key);
        let fetch = self.source.board_get(key);
        self.read_through(cache, key.to_string(), fetch).await
    }

    // ------------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------------

    /// Threads on a board. No threads is `NotFound`.
    pub async fn get_threads_by_board(&self, board: &BoardKey) -> ImgboardResult<Vec<Thread>> {
        let cache = self.caches.as_ref().map(|c| &c.thread_by_board);
        let fetch = async { Ok(non_empty(self.source.threads_by_board(board).await?)) };
        self.read_through(cache, board.to_string(), fetch).await
    }

    /// Threads started by an author. No threads is `NotFound`.
    pub async fn get_threads_by_author(&self, author: &AuthorKey) -> ImgboardResult<Vec<Thread>> {
        let cache = self.caches.as_ref().map(|c| &c.thread_by_author);
        let fetch = async { Ok(non_empty(self.source.threads_by_author(author).await?)) };
        self.read_through(cache, author.to_string(), fetch).await
    }

    pub async fn get_thread(&self, key: ThreadKey) -> ImgboardResult<Thread> {
        let cache = self.caches.as_ref().map(|c| &c.thread_by_key);
        let fetch = self.source.thread_get(key);
        self.read_through(cache, key.to_string(), fetch).await
    }

    /// Insert a thread and return its generated key.
    ///
    /// The thread namespaces are invalidated in the background; nothing is
    /// pre-populated.
    pub async fn put_thread(&self, thread: &NewThread) -> ImgboardResult<ThreadKey> {
        let key = self.source.thread_insert(thread).await?;
        debug!(thread = %key, board = %thread.board, "Thread inserted");
        self.invalidate_family(&Namespace::THREAD_FAMILY);
        Ok(key)
    }

    // ------------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------------

    /// Posts in a thread. No posts is `NotFound`.
    pub async fn get_posts_by_thread(&self, thread: ThreadKey) -> ImgboardResult<Vec<Post>> {
        let cache = self.caches.as_ref().map(|c| &c.post_by_thread);
        let fetch = async { Ok(non_empty(self.source.posts_by_thread(thread).await?)) };
        self.read_through(cache, thread.to_string(), fetch).await
    }

    /// Posts written by an author. No posts is `NotFound`.
    pub async fn get_posts_by_author(&self, author: &AuthorKey) -> ImgboardResult<Vec<Post>> {
        let cache = self.caches.as_ref().map(|c| &c.post_by_author);
        let fetch = async { Ok(non_empty(self.source.posts_by_author(author).await?)) };
        self.read_through(cache, author.to_string(), fetch).await
    }

    pub async fn get_post(&self, key: PostKey) -> ImgboardResult<Post> {
        let cache = self.caches.as_ref().map(|c| &c.post_by_key);
        let fetch = self.source.post_get(key);
        self.read_through(cache, key.to_string(), fetch).await
    }

    /// Insert a post and return its generated key.
    pub async fn put_post(&self, post: &NewPost) -> ImgboardResult<PostKey> {
        let key = self.source.post_insert(post).await?;
        debug!(post = %key, thread = %post.thread, "Post inserted");
        self.invalidate_family(&Namespace::POST_FAMILY);
        Ok(key)
    }

    // ------------------------------------------------------------------------
    // Authors
    // ------------------------------------------------------------------------

    pub async fn get_author(&self, key: &AuthorKey) -> ImgboardResult<Author> {
        let cache = self.caches.as_ref().map(|c| &c.author_by_key);
        let fetch = self.source.author_get(key);
        self.read_through(cache, key.to_string(), fetch).await
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Serve from `cache` if valid, otherwise await `fetch` and schedule a
    /// population with its result. `fetch` yielding `None` is `NotFound` for
    /// `T`'s entity type under `key`, and nothing is cached.
    ///
    /// A cache that errors is treated as a miss and no population is
    /// scheduled for that read.
    async fn read_through<T, F>(
        &self,
        cache: Option<&EntityCache<K, T>>,
        key: String,
        fetch: F,
    ) -> ImgboardResult<T>
    where
        T: CacheableEntity,
        F: Future<Output = StoreResult<Option<T>>>,
    {
        let mut populate = cache;
        if let Some(cache) = cache {
            match cache.read(&key).await {
                Ok(CacheLookup::Hit(value)) => return Ok(value),
                Ok(CacheLookup::Miss(_)) => {}
                Err(e) => {
                    self.stats.record_cache_error();
                    warn!(
                        namespace = %cache.namespace(),
                        entity_type = %T::entity_type(),
                        key = %key,
                        error = %e,
                        "Cache unavailable, reading from source of truth"
                    );
                    populate = None;
                }
            }
        }

        let value = fetch
            .await?
            .ok_or_else(|| StoreError::not_found(T::entity_type(), &key))?;

        if let Some(cache) = populate {
            let cache = cache.clone();
            let entry = value.clone();
            let entry_key = key.clone();
            self.populator
                .spawn(TaskKind::Populate, cache.namespace(), key, async move {
                    cache.write(&entry_key, &entry).await.map(|_| ())
                });
        }

        Ok(value)
    }

    /// Bump every namespace in `family` in the background.
    fn invalidate_family(&self, family: &[Namespace]) {
        let Some(caches) = self.caches.as_ref() else {
            return;
        };
        for &namespace in family {
            let raw = caches.raw.clone();
            self.populator
                .spawn(TaskKind::Invalidate, namespace, String::new(), async move {
                    raw.invalidate_namespace(namespace).await.map(|_| ())
                });
        }
    }
}

/// Zero rows for a secondary key means the key has nothing under it.
fn non_empty<T>(rows: Vec<T>) -> Option<Vec<T>> {
    (!rows.is_empty()).then_some(rows)
}
