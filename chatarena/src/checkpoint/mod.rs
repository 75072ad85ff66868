//! Durable, thread-keyed conversation state.
//!
//! A checkpoint is a full snapshot of a thread's message history, overwritten
//! after each completed turn and loaded at turn start. The contract is
//! deliberately small: `save` (idempotent overwrite), `load` (empty sequence
//! for an unknown thread), `list_threads`, and a `ping` probe.
//!
//! ## Implementations
//!
//! | Type            | Persistence  | Use case                | Feature    |
//! |-----------------|--------------|-------------------------|------------|
//! | [`MemorySaver`]   | In-memory    | Dev, tests              | —          |
//! | [`SqliteSaver`]   | SQLite file  | Single-node, production | `sqlite`   |
//! | [`PostgresSaver`] | PostgreSQL   | Shared deployments      | `postgres` |
//!
//! The SQL backends acquire a pool connection per operation and retry a
//! connection-level failure exactly once before surfacing an error (see
//! `retry`). Concurrent saves to different threads do not interfere; writers
//! to the *same* thread are not coordinated here — single active writer per
//! thread is the front end's discipline.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod retry;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemorySaver;
#[cfg(feature = "postgres")]
pub use postgres::PostgresSaver;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSaver;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::Message;

/// Checkpoint persistence failure.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Backing storage unavailable or the operation failed after retry.
    #[error("storage error: {0}")]
    Storage(String),
    /// Message payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Thread-keyed checkpoint store.
///
/// **Interaction**: the turn engine loads at turn start and saves after clean
/// completion only; the front end uses `load`/`list_threads` for its thread
/// sidebar.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Idempotent overwrite of the thread's persisted history.
    async fn save(&self, thread_id: &str, messages: &[Message]) -> Result<(), CheckpointError>;

    /// Full history for the thread; an unknown thread is an empty sequence,
    /// not an error.
    async fn load(&self, thread_id: &str) -> Result<Vec<Message>, CheckpointError>;

    /// Every thread id with at least one saved checkpoint, most recently
    /// updated first where the backend tracks recency.
    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError>;

    /// Cheap connectivity probe; in-memory implementations are always healthy.
    async fn ping(&self) -> Result<(), CheckpointError> {
        Ok(())
    }
}
