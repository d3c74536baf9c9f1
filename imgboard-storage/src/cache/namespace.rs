//! Cache namespaces and the key layout derived from them.
//!
//! A namespace is one invalidation domain: every entry in it shares one
//! change counter. Keys are laid out as
//!
//! - entries:  `<prefix>:<namespace>:<entity-key>`
//! - counters: `<prefix>:<namespace>:last-change`

use std::fmt;

use imgboard_core::EntityType;

/// Entity-key segment reserved for the namespace counter.
pub const COUNTER_SUFFIX: &str = "last-change";

/// Static set of cache namespaces, one per entity type and access pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    BoardList,
    BoardByKey,
    ThreadByBoard,
    ThreadByAuthor,
    ThreadByKey,
    PostByThread,
    PostByAuthor,
    PostByKey,
    AuthorByKey,
}

impl Namespace {
    pub const ALL: [Namespace; 9] = [
        Namespace::BoardList,
        Namespace::BoardByKey,
        Namespace::ThreadByBoard,
        Namespace::ThreadByAuthor,
        Namespace::ThreadByKey,
        Namespace::PostByThread,
        Namespace::PostByAuthor,
        Namespace::PostByKey,
        Namespace::AuthorByKey,
    ];

    /// Namespaces that can hold a derivation of a newly inserted thread.
    pub const THREAD_FAMILY: [Namespace; 3] = [
        Namespace::ThreadByBoard,
        Namespace::ThreadByAuthor,
        Namespace::ThreadByKey,
    ];

    /// Namespaces that can hold a derivation of a newly inserted post.
    pub const POST_FAMILY: [Namespace; 3] = [
        Namespace::PostByThread,
        Namespace::PostByAuthor,
        Namespace::PostByKey,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::BoardList => "board-list",
            Namespace::BoardByKey => "board-by-key",
            Namespace::ThreadByBoard => "thread-by-board",
            Namespace::ThreadByAuthor => "thread-by-author",
            Namespace::ThreadByKey => "thread-by-key",
            Namespace::PostByThread => "post-by-thread",
            Namespace::PostByAuthor => "post-by-author",
            Namespace::PostByKey => "post-by-key",
            Namespace::AuthorByKey => "author-by-key",
        }
    }

    /// Entity type stored under this namespace.
    pub fn entity_type(&self) -> EntityType {
        match self {
            Namespace::BoardList | Namespace::BoardByKey => EntityType::Board,
            Namespace::ThreadByBoard | Namespace::ThreadByAuthor | Namespace::ThreadByKey => {
                EntityType::Thread
            }
            Namespace::PostByThread | Namespace::PostByAuthor | Namespace::PostByKey => {
                EntityType::Post
            }
            Namespace::AuthorByKey => EntityType::Author,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps namespaces and entity keys to store keys.
///
/// Holds no state beyond the application prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    prefix: String,
}

impl KeyLayout {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Store key of the change counter for `namespace`.
    pub fn counter_key(&self, namespace: Namespace) -> String {
        format!("{}:{}:{}", self.prefix, namespace.as_str(), COUNTER_SUFFIX)
    }

    /// Store key of the cache entry for `entity_key` under `namespace`.
    pub fn entry_key(&self, namespace: Namespace, entity_key: &str) -> String {
        format!("{}:{}:{}", self.prefix, namespace.as_str(), entity_key)
    }

    /// An entity key that would alias the namespace counter. Such keys are
    /// never cached.
    pub fn is_reserved(entity_key: &str) -> bool {
        entity_key == COUNTER_SUFFIX
    }
}
