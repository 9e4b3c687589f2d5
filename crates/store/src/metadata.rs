//! SQLite backed permission table.
//!
//! Each configured table name maps to one SQLite table keyed by
//! `(user, path)`; the full item is kept as JSON text next to the key.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Row,
};

use common::error::StoreError;
use common::metadata::{EntryKey, Item, MetadataBackend, BATCH_WRITE_LIMIT};

use crate::error::{Result, StoreSetupError};

/// Check that `name` can be used as a table name.
pub fn validate_table_name(name: &str) -> Result<()> {
    let valid_len = (3..=255).contains(&name.len());
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid_len || !valid_chars {
        return Err(StoreSetupError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

/// Quoted identifier; only valid for names that passed
/// [`validate_table_name`].
fn quoted(table: &str) -> String {
    format!("\"{}\"", table)
}

fn database_error(e: sqlx::Error) -> StoreError {
    StoreError::service("Database", e)
}

/// SQLite database connection pool.
#[derive(Debug, Clone)]
pub struct SqliteMetadataBackend {
    pool: SqlitePool,
}

impl SqliteMetadataBackend {
    /// Open (or create) a database file.
    pub async fn new(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::info!(path = %path.display(), "opened metadata database");
        Ok(Self { pool })
    }

    /// Create an in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().filename(":memory:");

        // the database lives exactly as long as its only connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create `table` if it does not exist yet.
    pub async fn ensure_table(&self, table: &str) -> Result<()> {
        validate_table_name(table)?;
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                user TEXT NOT NULL,
                path TEXT NOT NULL,
                item TEXT NOT NULL,
                PRIMARY KEY (user, path)
            )
            "#,
            quoted(table)
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataBackend for SqliteMetadataBackend {
    async fn put_if_absent(
        &self,
        table: &str,
        key: &EntryKey,
        item: Item,
    ) -> std::result::Result<(), StoreError> {
        let encoded = serde_json::to_string(&item)
            .map_err(|e| StoreError::service("SerializationException", e))?;

        let result = sqlx::query(&format!(
            r#"
            INSERT INTO {} (user, path, item)
            VALUES (?, ?, ?)
            ON CONFLICT(user, path) DO NOTHING
            "#,
            quoted(table)
        ))
        .bind(&key.user)
        .bind(&key.path)
        .bind(encoded)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConditionalCheckFailed);
        }
        Ok(())
    }

    async fn get(
        &self,
        table: &str,
        key: &EntryKey,
        projection: &[&str],
    ) -> std::result::Result<Option<Item>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT item FROM {} WHERE user = ? AND path = ?
            "#,
            quoted(table)
        ))
        .bind(&key.user)
        .bind(&key.path)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut item: Item = serde_json::from_str(row.get::<&str, _>("item"))
            .map_err(|e| StoreError::service("SerializationException", e))?;
        if !projection.is_empty() {
            item.retain(|name, _| projection.contains(&name.as_str()));
        }
        Ok(Some(item))
    }

    async fn delete(&self, table: &str, key: &EntryKey) -> std::result::Result<(), StoreError> {
        sqlx::query(&format!(
            r#"
            DELETE FROM {} WHERE user = ? AND path = ?
            "#,
            quoted(table)
        ))
        .bind(&key.user)
        .bind(&key.path)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;
        Ok(())
    }

    async fn batch_delete(
        &self,
        table: &str,
        keys: Vec<EntryKey>,
    ) -> std::result::Result<Vec<EntryKey>, StoreError> {
        if keys.len() > BATCH_WRITE_LIMIT {
            return Err(StoreError::service(
                "ValidationException",
                format!(
                    "batch of {} keys exceeds the limit of {}",
                    keys.len(),
                    BATCH_WRITE_LIMIT
                ),
            ));
        }

        let statement = format!(
            r#"
            DELETE FROM {} WHERE user = ? AND path = ?
            "#,
            quoted(table)
        );
        let mut conn = self.pool.acquire().await.map_err(database_error)?;

        let mut unprocessed = Vec::new();
        for key in keys {
            let result = sqlx::query(&statement)
                .bind(&key.user)
                .bind(&key.path)
                .execute(&mut *conn)
                .await;
            if let Err(e) = result {
                tracing::debug!(user = %key.user, path = %key.path, "batch item failed: {}", e);
                unprocessed.push(key);
            }
        }
        Ok(unprocessed)
    }

    async fn ping(&self) -> std::result::Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(())
    }
}
