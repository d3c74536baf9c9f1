//! Source-of-truth contract and an in-process implementation.
//!
//! The relational store owns every entity; the cache layer only ever reads
//! from it on a miss and writes to it on insert. "No rows" is reported as
//! `Ok(None)` for item reads and an empty `Vec` for list reads, never as an
//! error; errors are reserved for transport or constraint failures.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use imgboard_core::{
    Author, AuthorKey, Board, BoardKey, EntityType, Image, ImageKey, NewPost, NewThread, Post,
    PostKey, StoreError, StoreResult, Thread, ThreadKey,
};
use tokio::sync::RwLock;

/// Source-of-truth trait for imgboard entities.
#[async_trait]
pub trait SourceOfTruth: Send + Sync {
    // === Board Operations ===

    /// List every board.
    async fn board_list(&self) -> StoreResult<Vec<Board>>;

    /// Get a board by key.
    async fn board_get(&self, key: &BoardKey) -> StoreResult<Option<Board>>;

    // === Thread Operations ===

    /// Get a thread by key.
    async fn thread_get(&self, key: ThreadKey) -> StoreResult<Option<Thread>>;

    /// List threads opened on a board.
    async fn threads_by_board(&self, board: &BoardKey) -> StoreResult<Vec<Thread>>;

    /// List threads opened by an author.
    async fn threads_by_author(&self, author: &AuthorKey) -> StoreResult<Vec<Thread>>;

    /// Insert a thread, returning the generated key.
    async fn thread_insert(&self, thread: &NewThread) -> StoreResult<ThreadKey>;

    // === Post Operations ===

    /// Get a post by key.
    async fn post_get(&self, key: PostKey) -> StoreResult<Option<Post>>;

    /// List posts in a thread.
    async fn posts_by_thread(&self, thread: ThreadKey) -> StoreResult<Vec<Post>>;

    /// List posts written by an author.
    async fn posts_by_author(&self, author: &AuthorKey) -> StoreResult<Vec<Post>>;

    /// Insert a post, returning the generated key.
    async fn post_insert(&self, post: &NewPost) -> StoreResult<PostKey>;

    // === Author Operations ===

    /// Get an author by key.
    async fn author_get(&self, key: &AuthorKey) -> StoreResult<Option<Author>>;
}

#[derive(Debug, Default)]
struct Tables {
    boards: BTreeMap<BoardKey, Board>,
    threads: BTreeMap<ThreadKey, Thread>,
    posts: BTreeMap<PostKey, Post>,
    authors: HashMap<AuthorKey, Author>,
    images: HashMap<ImageKey, Image>,
    last_thread_key: i64,
    last_post_key: i64,
}

impl Tables {
    fn image_path(&self, image: Option<ImageKey>) -> StoreResult<Option<String>> {
        match image {
            None => Ok(None),
            Some(key) => self
                .images
                .get(&key)
                .map(|image| Some(image.file_path.clone()))
                .ok_or_else(|| StoreError::InsertFailed {
                    entity_type: EntityType::Image,
                    reason: format!("image {} does not exist", key),
                }),
        }
    }
}

/// In-memory source of truth.
///
/// Keys for threads and posts are generated from per-table sequences, the
/// way the relational schema does it. Foreign references are checked on
/// insert.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: RwLock<Tables>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a board.
    pub async fn add_board(&self, board: Board) {
        let mut tables = self.tables.write().await;
        tables.boards.insert(board.key.clone(), board);
    }

    /// Add or replace an author.
    pub async fn add_author(&self, author: Author) {
        let mut tables = self.tables.write().await;
        tables.authors.insert(author.key.clone(), author);
    }

    /// Register an uploaded image so threads and posts can reference it.
    pub async fn add_image(&self, image: Image) {
        let mut tables = self.tables.write().await;
        tables.images.insert(image.key, image);
    }

    /// Get count of stored threads.
    pub async fn thread_count(&self) -> usize {
        self.tables.read().await.threads.len()
    }

    /// Get count of stored posts.
    pub async fn post_count(&self) -> usize {
        self.tables.read().await.posts.len()
    }
}

#[async_trait]
impl SourceOfTruth for MemorySource {
    async fn board_list(&self) -> StoreResult<Vec<Board>> {
        let tables = self.tables.read().await;
        Ok(tables.boards.values().cloned().collect())
    }

    async fn board_get(&self, key: &BoardKey) -> StoreResult<Option<Board>> {
        let tables = self.tables.read().await;
        Ok(tables.boards.get(key).cloned())
    }

    async fn thread_get(&self, key: ThreadKey) -> StoreResult<Option<Thread>> {
        let tables = self.tables.read().await;
        Ok(tables.threads.get(&key).cloned())
    }

    async fn threads_by_board(&self, board: &BoardKey) -> StoreResult<Vec<Thread>> {
        let tables = self.tables.read().await;
        Ok(tables
            .threads
            .values()
            .filter(|t| &t.board == board)
            .cloned()
            .collect())
    }

    async fn threads_by_author(&self, author: &AuthorKey) -> StoreResult<Vec<Thread>> {
        let tables = self.tables.read().await;
        Ok(tables
            .threads
            .values()
            .filter(|t| &t.author == author)
            .cloned()
            .collect())
    }

    async fn thread_insert(&self, thread: &NewThread) -> StoreResult<ThreadKey> {
        let mut tables = self.tables.write().await;
        if !tables.boards.contains_key(&thread.board) {
            return Err(StoreError::InsertFailed {
                entity_type: EntityType::Thread,
                reason: format!("board {} does not exist", thread.board),
            });
        }
        let image_path = tables.image_path(thread.image)?;

        tables.last_thread_key += 1;
        let key = ThreadKey(tables.last_thread_key);
        tables
            .threads
            .insert(key, thread.clone().into_thread(key, image_path));
        Ok(key)
    }

    async fn post_get(&self, key: PostKey) -> StoreResult<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&key).cloned())
    }

    async fn posts_by_thread(&self, thread: ThreadKey) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .filter(|p| p.thread == thread)
            .cloned()
            .collect())
    }

    async fn posts_by_author(&self, author: &AuthorKey) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .filter(|p| &p.author == author)
            .cloned()
            .collect())
    }

    async fn post_insert(&self, post: &NewPost) -> StoreResult<PostKey> {
        let mut tables = self.tables.write().await;
        if !tables.threads.contains_key(&post.thread) {
            return Err(StoreError::InsertFailed {
                entity_type: EntityType::Post,
                reason: format!("thread {} does not exist", post.thread),
            });
        }
        let image_path = tables.image_path(post.image)?;

        tables.last_post_key += 1;
        let key = PostKey(tables.last_post_key);
        tables.posts.insert(key, post.clone().into_post(key, image_path));
        Ok(key)
    }

    async fn author_get(&self, key: &AuthorKey) -> StoreResult<Option<Author>> {
        let tables = self.tables.read().await;
        Ok(tables.authors.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_new_thread(board: &str, author: &str) -> NewThread {
        NewThread {
            title: "Test thread".to_string(),
            author: AuthorKey::from(author),
            board: BoardKey::from(board),
            created_at: Utc::now(),
            image: None,
        }
    }

    fn make_new_post(thread: ThreadKey, author: &str) -> NewPost {
        NewPost {
            author: AuthorKey::from(author),
            thread,
            created_at: Utc::now(),
            text: "Test post".to_string(),
            image: None,
        }
    }

    async fn source_with_board(board: &str) -> MemorySource {
        let source = MemorySource::new();
        source.add_board(Board::new(board, "Test board")).await;
        source
    }

    #[tokio::test]
    async fn test_board_list_and_get() {
        let source = MemorySource::new();
        assert!(source.board_list().await.unwrap().is_empty());

        source.add_board(Board::new("b", "Random")).await;
        source.add_board(Board::new("a", "Anime")).await;

        let boards = source.board_list().await.unwrap();
        assert_eq!(boards.len(), 2);
        assert_eq!(boards[0].key, BoardKey::from("a"));

        let board = source.board_get(&BoardKey::from("b")).await.unwrap();
        assert_eq!(board.map(|b| b.name), Some("Random".to_string()));
        assert!(source.board_get(&BoardKey::from("z")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_thread_insert_generates_sequential_keys() {
        let source = source_with_board("a").await;

        let first = source.thread_insert(&make_new_thread("a", "u1")).await.unwrap();
        let second = source.thread_insert(&make_new_thread("a", "u2")).await.unwrap();

        assert_eq!(first, ThreadKey(1));
        assert_eq!(second, ThreadKey(2));
        assert_eq!(source.thread_count().await, 2);

        let stored = source.thread_get(second).await.unwrap().unwrap();
        assert_eq!(stored.author, AuthorKey::from("u2"));
    }

    #[tokio::test]
    async fn test_thread_insert_requires_board() {
        let source = MemorySource::new();
        let result = source.thread_insert(&make_new_thread("missing", "u1")).await;
        assert!(matches!(result, Err(StoreError::InsertFailed { .. })));
        assert_eq!(source.thread_count().await, 0);
    }

    #[tokio::test]
    async fn test_thread_insert_resolves_image_path() {
        let source = source_with_board("a").await;
        let image = Image {
            key: ImageKey::generate(),
            file_path: "/img/cat.png".to_string(),
        };
        source.add_image(image.clone()).await;

        let mut new_thread = make_new_thread("a", "u1");
        new_thread.image = Some(image.key);
        let key = source.thread_insert(&new_thread).await.unwrap();

        let stored = source.thread_get(key).await.unwrap().unwrap();
        assert_eq!(stored.image_path_or_empty(), "/img/cat.png");

        new_thread.image = Some(ImageKey::generate());
        assert!(source.thread_insert(&new_thread).await.is_err());
    }

    #[tokio::test]
    async fn test_threads_by_board_and_author() {
        let source = source_with_board("a").await;
        source.add_board(Board::new("b", "Random")).await;

        source.thread_insert(&make_new_thread("a", "u1")).await.unwrap();
        source.thread_insert(&make_new_thread("b", "u1")).await.unwrap();
        source.thread_insert(&make_new_thread("a", "u2")).await.unwrap();

        let on_a = source.threads_by_board(&BoardKey::from("a")).await.unwrap();
        assert_eq!(on_a.len(), 2);

        let by_u1 = source.threads_by_author(&AuthorKey::from("u1")).await.unwrap();
        assert_eq!(by_u1.len(), 2);

        let none = source.threads_by_board(&BoardKey::from("c")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_post_insert_and_queries() {
        let source = source_with_board("a").await;
        let thread = source.thread_insert(&make_new_thread("a", "u1")).await.unwrap();

        let p1 = source.post_insert(&make_new_post(thread, "u1")).await.unwrap();
        let p2 = source.post_insert(&make_new_post(thread, "u2")).await.unwrap();
        assert_ne!(p1, p2);
        assert_eq!(source.post_count().await, 2);

        assert_eq!(source.posts_by_thread(thread).await.unwrap().len(), 2);
        assert_eq!(
            source.posts_by_author(&AuthorKey::from("u2")).await.unwrap().len(),
            1
        );
        assert!(source.post_get(p1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_post_insert_requires_thread() {
        let source = MemorySource::new();
        let result = source.post_insert(&make_new_post(ThreadKey(99), "u1")).await;
        assert!(matches!(
            result,
            Err(StoreError::InsertFailed {
                entity_type: EntityType::Post,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_author_get() {
        let source = MemorySource::new();
        source
            .add_author(Author {
                key: AuthorKey::from("u1"),
                name: "Anonymous".to_string(),
            })
            .await;

        let author = source.author_get(&AuthorKey::from("u1")).await.unwrap();
        assert_eq!(author.map(|a| a.name), Some("Anonymous".to_string()));
        assert!(source.author_get(&AuthorKey::from("u2")).await.unwrap().is_none());
    }
}
