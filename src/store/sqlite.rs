//! SQLite-backed [`CommentStore`].

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::CommentStore;
use crate::error::{PulseError, Result};
use crate::model::{Comment, Item, SentimentLabel};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS items (
    item_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    view_count INTEGER NOT NULL,
    like_count INTEGER NOT NULL,
    comment_count INTEGER NOT NULL,
    duration TEXT NOT NULL,
    published_at TEXT NOT NULL,
    channel TEXT NOT NULL,
    tags TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    item_id TEXT NOT NULL,
    comment_id TEXT NOT NULL,
    author TEXT NOT NULL,
    text TEXT NOT NULL,
    like_count INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    sentiment_score REAL NOT NULL,
    sentiment_label TEXT NOT NULL,
    reply_count INTEGER NOT NULL DEFAULT 0,
    is_reply BOOLEAN NOT NULL DEFAULT FALSE,
    parent_id TEXT,
    PRIMARY KEY (item_id, comment_id)
);

CREATE INDEX IF NOT EXISTS idx_comments_item_time ON comments(item_id, timestamp);
";

const IN_MEMORY: &str = ":memory:";

/// Store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    ///
    /// `:memory:` opens a private in-memory database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = if path == Path::new(IN_MEMORY) {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(path)?;
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            conn
        };
        conn.execute_batch(SCHEMA)?;
        info!("Opened comment store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(Path::new(IN_MEMORY))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| PulseError::StoreUnavailable("connection lock poisoned".into()))?;
        f(&mut conn)
    }
}

fn conversion_error(column: usize, e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, e.into())
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let label: String = row.get(6)?;
    Ok(Comment {
        comment_id: row.get(0)?,
        author: row.get(1)?,
        text: row.get(2)?,
        like_count: row.get(3)?,
        timestamp: row.get(4)?,
        sentiment_score: row.get(5)?,
        sentiment_label: label.parse::<SentimentLabel>().map_err(|e| conversion_error(6, e))?,
        reply_count: row.get(7)?,
        is_reply: row.get(8)?,
        parent_id: row.get(9)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let tags: String = row.get(9)?;
    Ok(Item {
        item_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        view_count: row.get(3)?,
        like_count: row.get(4)?,
        comment_count: row.get(5)?,
        duration: row.get(6)?,
        published_at: row.get(7)?,
        channel: row.get(8)?,
        tags: serde_json::from_str(&tags).map_err(|e| conversion_error(9, e))?,
    })
}

#[async_trait]
impl CommentStore for SqliteStore {
    async fn upsert_comments(&self, item_id: &str, comments: &[Comment]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT OR REPLACE INTO comments
                     (item_id, comment_id, author, text, like_count, timestamp,
                      sentiment_score, sentiment_label, reply_count, is_reply, parent_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                )?;
                for c in comments {
                    stmt.execute(params![
                        item_id,
                        c.comment_id,
                        c.author,
                        c.text,
                        c.like_count,
                        c.timestamp,
                        c.sentiment_score,
                        c.sentiment_label.as_str(),
                        c.reply_count,
                        c.is_reply,
                        c.parent_id,
                    ])?;
                }
            }
            tx.commit()?;
            debug!(item_id, "Upserted {} comments", comments.len());
            Ok(())
        })
    }

    async fn upsert_item(&self, item: &Item) -> Result<()> {
        let tags = serde_json::to_string(&item.tags)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO items
                 (item_id, title, description, view_count, like_count, comment_count,
                  duration, published_at, channel, tags)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    item.item_id,
                    item.title,
                    item.description,
                    item.view_count,
                    item.like_count,
                    item.comment_count,
                    item.duration,
                    item.published_at,
                    item.channel,
                    tags,
                ],
            )?;
            Ok(())
        })
    }

    async fn query_top_level_comments(&self, item_id: &str) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT comment_id, author, text, like_count, timestamp, sentiment_score,
                        sentiment_label, reply_count, is_reply, parent_id
                 FROM comments
                 WHERE item_id = ?1 AND is_reply = 0
                 ORDER BY timestamp DESC, rowid ASC",
            )?;
            let rows = stmt.query_map([item_id], comment_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    async fn get_item(&self, item_id: &str) -> Result<Option<Item>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT item_id, title, description, view_count, like_count, comment_count,
                            duration, published_at, channel, tags
                     FROM items WHERE item_id = ?1",
                    [item_id],
                    item_from_row,
                )
                .optional()?)
        })
    }
}
