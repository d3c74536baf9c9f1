//! Core entity structures
//!
//! These mirror rows owned by the relational store. The cache never
//! originates them; it only stores copies of read results.

use crate::{AuthorKey, BoardKey, ImageKey, PostKey, ThreadKey, Timestamp};
use serde::{Deserialize, Serialize};

/// A board, e.g. `/a/ - Anime`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub key: BoardKey,
    pub name: String,
}

impl Board {
    pub fn new(key: impl Into<BoardKey>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

/// A thread opened on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub key: ThreadKey,
    pub title: String,
    pub author: AuthorKey,
    pub board: BoardKey,
    pub created_at: Timestamp,
    pub image: Option<ImageKey>,
    /// Resolved from the image table on read.
    pub image_path: Option<String>,
}

impl Thread {
    /// Path of the attached image, or an empty string when there is none.
    pub fn image_path_or_empty(&self) -> &str {
        self.image_path.as_deref().unwrap_or("")
    }
}

/// Insert payload for a thread. The key is generated by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThread {
    pub title: String,
    pub author: AuthorKey,
    pub board: BoardKey,
    pub created_at: Timestamp,
    pub image: Option<ImageKey>,
}

impl NewThread {
    /// Materialize the stored row once the store has assigned a key.
    pub fn into_thread(self, key: ThreadKey, image_path: Option<String>) -> Thread {
        Thread {
            key,
            title: self.title,
            author: self.author,
            board: self.board,
            created_at: self.created_at,
            image: self.image,
            image_path,
        }
    }
}

/// A reply in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub key: PostKey,
    pub author: AuthorKey,
    pub thread: ThreadKey,
    pub created_at: Timestamp,
    pub text: String,
    pub image: Option<ImageKey>,
    pub image_path: Option<String>,
}

impl Post {
    /// Path of the attached image, or an empty string when there is none.
    pub fn image_path_or_empty(&self) -> &str {
        self.image_path.as_deref().unwrap_or("")
    }
}

/// Insert payload for a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub author: AuthorKey,
    pub thread: ThreadKey,
    pub created_at: Timestamp,
    pub text: String,
    pub image: Option<ImageKey>,
}

impl NewPost {
    pub fn into_post(self, key: PostKey, image_path: Option<String>) -> Post {
        Post {
            key,
            author: self.author,
            thread: self.thread,
            created_at: self.created_at,
            text: self.text,
            image: self.image,
            image_path,
        }
    }
}

/// A poster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub key: AuthorKey,
    pub name: String,
}

/// An uploaded image. Only the path is tracked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub key: ImageKey,
    pub file_path: String,
}
