//! PostgreSQL checkpoint backend.
//!
//! Same logical schema as the SQLite backend with `messages` as JSONB.
//! Connections come from a shared pool, acquired per operation, so one dead
//! connection never wedges subsequent saves or loads.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::debug;

use super::retry::with_retry;
use super::{CheckpointError, Checkpointer};
use crate::message::Message;

/// PostgreSQL-backed checkpoint store.
pub struct PostgresSaver {
    pool: PgPool,
}

impl PostgresSaver {
    /// Connects to the database and runs migrations.
    pub async fn connect(database_url: &str) -> Result<Self, CheckpointError> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| CheckpointError::Storage(format!("PostgreSQL connection failed: {e}")))?;
        let saver = Self { pool };
        saver.migrate().await?;
        debug!("PostgreSQL checkpoint store ready");
        Ok(saver)
    }

    /// Builds on an existing pool.
    pub async fn from_pool(pool: PgPool) -> Result<Self, CheckpointError> {
        let saver = Self { pool };
        saver.migrate().await?;
        Ok(saver)
    }

    async fn migrate(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id  TEXT PRIMARY KEY,
                messages   JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
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
impl Checkpointer for PostgresSaver {
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
                    VALUES ($1, $2::jsonb, now())
                    ON CONFLICT (thread_id) DO UPDATE SET
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
                sqlx::query("SELECT messages::text AS messages FROM checkpoints WHERE thread_id = $1")
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
