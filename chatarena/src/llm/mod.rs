//! Model invoker abstraction.
//!
//! The turn engine depends on a callable that takes the full message history
//! plus the tool registry's specs and returns either a final assistant answer
//! or a structured request to invoke one or more tools. [`OpenAiChat`] is the
//! production client (OpenAI-compatible chat completions); [`MockLlm`] scripts
//! responses for tests.

mod mock;
mod open_ai;

pub use mock::MockLlm;
pub use open_ai::OpenAiChat;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

/// Model invocation failure.
///
/// The turn engine does not retry: the turn aborts without persisting, and
/// the thread's last checkpoint remains the recovery point.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Request could not be sent or the response body could not be read.
    #[error("request failed: {0}")]
    Transport(String),
    /// Provider returned a non-success status.
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// Response arrived but did not match the expected wire shape.
    #[error("invalid response: {0}")]
    ResponseFormat(String),
}

/// Response from one completion: assistant text and any requested tool calls.
///
/// Empty `tool_calls` is a final answer; non-empty means the engine must
/// dispatch each call and re-invoke with the results appended.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// One fragment of streamed assistant content.
#[derive(Debug, Clone)]
pub struct MessageChunk {
    pub content: String,
}

/// Model client: given the history and available tool specs, produce the next
/// assistant message.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One completion over the full history. `tools` describes what the model
    /// may call; pass an empty slice to disable tool calling.
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, LlmError>;

    /// Streaming variant: content fragments are sent on `chunks` as they
    /// arrive and the fully accumulated response is returned at the end. The
    /// fragment sequence is finite and not restartable; a fresh call must be
    /// made to regenerate.
    ///
    /// The default implementation performs a plain [`invoke`](Self::invoke)
    /// and emits the final content as a single chunk, so clients without
    /// native streaming still work with streaming consumers.
    async fn invoke_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        chunks: mpsc::Sender<MessageChunk>,
    ) -> Result<LlmResponse, LlmError> {
        let response = self.invoke(messages, tools).await?;
        if !response.content.is_empty() {
            let _ = chunks
                .send(MessageChunk {
                    content: response.content.clone(),
                })
                .await;
        }
        Ok(response)
    }
}
