//! Message persistence over SQLite via sqlx.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use sqlx::Row;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: String,
    pub content: String,
    pub author: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row store consumed by the command loop. Each call is a single
/// auto-committed statement; there are no cross-call transactions.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create(&self, content: &str, author: &str, category: Option<&str>) -> Result<String>;
    async fn list(&self, category: Option<&str>) -> Result<Vec<StoredMessage>>;
    /// Returns false when no row matched `id`.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Cheap to clone (the pool is an Arc internally).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database at `db_path` and ensures the schema.
    ///
    /// WAL journal mode is configured at connection time; SQLite forbids
    /// changing it inside a transaction.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS hidden_messages (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                author TEXT NOT NULL,
                category TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

fn short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredMessage> {
    Ok(StoredMessage {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        author: row.try_get("author")?,
        category: row.try_get("category")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn create(&self, content: &str, author: &str, category: Option<&str>) -> Result<String> {
        let id = short_id();
        sqlx::query(
            "INSERT INTO hidden_messages (id, content, author, category, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(content)
        .bind(author)
        .bind(category)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list(&self, category: Option<&str>) -> Result<Vec<StoredMessage>> {
        let rows = match category {
            Some(category) => {
                sqlx::query(
                    "SELECT id, content, author, category, created_at
                     FROM hidden_messages WHERE category = ? ORDER BY created_at",
                )
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, content, author, category, created_at
                     FROM hidden_messages ORDER BY created_at",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(row_to_message).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM hidden_messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
