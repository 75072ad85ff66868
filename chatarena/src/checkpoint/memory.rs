//! In-memory checkpoint store for dev and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CheckpointError, Checkpointer};
use crate::message::Message;

/// Keeps thread histories in a process-local map. Nothing survives restart.
#[derive(Default)]
pub struct MemorySaver {
    threads: DashMap<String, Vec<Message>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemorySaver {
    async fn save(&self, thread_id: &str, messages: &[Message]) -> Result<(), CheckpointError> {
        self.threads
            .insert(thread_id.to_string(), messages.to_vec());
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Vec<Message>, CheckpointError> {
        Ok(self
            .threads
            .get(thread_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        Ok(self.threads.iter().map(|e| e.key().clone()).collect())
    }
}
