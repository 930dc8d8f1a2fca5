//! Comment and item persistence.
//!
//! The pipeline only talks to storage through [`CommentStore`]. Two
//! implementations ship with the crate:
//!
//! - [`MemoryStore`]: process-local, used by tests and `:memory:` setups
//! - [`SqliteStore`]: file-backed via `rusqlite`
//!
//! Both are idempotent under repeated upserts: the last write for a given
//! `(item_id, comment_id)` wins.

pub mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::{Comment, Item};

pub use sqlite::SqliteStore;

/// Narrow read/write contract over stored comments and items.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Insert or replace `comments` under `item_id`.
    async fn upsert_comments(&self, item_id: &str, comments: &[Comment]) -> Result<()>;

    /// Insert or replace item metadata.
    async fn upsert_item(&self, item: &Item) -> Result<()>;

    /// Stored non-reply comments for `item_id`, newest first.
    async fn query_top_level_comments(&self, item_id: &str) -> Result<Vec<Comment>>;

    async fn get_item(&self, item_id: &str) -> Result<Option<Item>>;
}

/// Comments for one item, kept in first-insertion order.
#[derive(Debug, Default)]
struct ItemComments {
    order: Vec<String>,
    by_id: HashMap<String, Comment>,
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    comments: RwLock<HashMap<String, ItemComments>>,
    items: RwLock<HashMap<String, Item>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn upsert_comments(&self, item_id: &str, comments: &[Comment]) -> Result<()> {
        let mut all = self.comments.write().await;
        let entry = all.entry(item_id.to_string()).or_default();
        for comment in comments {
            if entry
                .by_id
                .insert(comment.comment_id.clone(), comment.clone())
                .is_none()
            {
                entry.order.push(comment.comment_id.clone());
            }
        }
        Ok(())
    }

    async fn upsert_item(&self, item: &Item) -> Result<()> {
        self.items
            .write()
            .await
            .insert(item.item_id.clone(), item.clone());
        Ok(())
    }

    async fn query_top_level_comments(&self, item_id: &str) -> Result<Vec<Comment>> {
        let all = self.comments.read().await;
        let Some(entry) = all.get(item_id) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Comment> = entry
            .order
            .iter()
            .filter_map(|id| entry.by_id.get(id))
            .filter(|c| !c.is_reply)
            .cloned()
            .collect();
        // stable: equal timestamps keep insertion order
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<Item>> {
        Ok(self.items.read().await.get(item_id).cloned())
    }
}
