//! SQLite checkpoint backend.
//!
//! One row per thread: `checkpoints(thread_id PRIMARY KEY, messages, updated_at)`
//! with the history stored as a JSON document. Save is an upsert, so
//! checkpoints are idempotent overwrites.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::retry::with_retry;
use super::{CheckpointError, Checkpointer};
use crate::message::Message;

/// SQLite-backed checkpoint store.
pub struct SqliteSaver {
    pool: SqlitePool,
}

impl SqliteSaver {
    /// Opens (or creates) the database file and runs migrations.
    pub async fn new(path: &str) -> Result<Self, CheckpointError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| CheckpointError::Storage(format!("invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Storage(format!("failed to open SQLite: {e}")))?;

        let saver = Self { pool };
        saver.migrate().await?;
        debug!(path, "SQLite checkpoint store ready");
        Ok(saver)
    }

    /// Builds on an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CheckpointError> {
        let saver = Self { pool };
        saver.migrate().await?;
        Ok(saver)
    }

    async fn migrate(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id  TEXT PRIMARY KEY,
                messages   TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(format!("checkpoints table: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Checkpointer for SqliteSaver {
    async fn save(&self, thread_id: &str, messages: &[Message]) -> Result<(), CheckpointError> {
        let payload = serde_json::to_string(messages)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        with_retry(|| {
            let pool = self.pool.clone();
            let payload = payload.clone();
            async move {
                sqlx::query(
                    r#"
                    INSERT INTO checkpoints (thread_id, messages, updated_at)
                    VALUES (?, ?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                    ON CONFLICT(thread_id) DO UPDATE SET
                        messages = excluded.messages,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(thread_id)
                .bind(&payload)
                .execute(&pool)
                .await
                .map(|_| ())
            }
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))
    }

    async fn load(&self, thread_id: &str) -> Result<Vec<Message>, CheckpointError> {
        let row = with_retry(|| {
            let pool = self.pool.clone();
            async move {
                sqlx::query("SELECT messages FROM checkpoints WHERE thread_id = ?")
                    .bind(thread_id)
                    .fetch_optional(&pool)
                    .await
            }
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        match row {
            None => Ok(Vec::new()),
            Some(row) => {
                let payload: String = row
                    .try_get("messages")
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?;
                serde_json::from_str(&payload)
                    .map_err(|e| CheckpointError::Serialization(e.to_string()))
            }
        }
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        let rows = with_retry(|| {
            let pool = self.pool.clone();
            async move {
                sqlx::query("SELECT thread_id FROM checkpoints ORDER BY updated_at DESC")
                    .fetch_all(&pool)
                    .await
            }
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get("thread_id")
                    .map_err(|e| CheckpointError::Storage(e.to_string()))
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), CheckpointError> {
        with_retry(|| {
            let pool = self.pool.clone();
            async move { sqlx::query("SELECT 1").execute(&pool).await.map(|_| ()) }
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))
    }
}
