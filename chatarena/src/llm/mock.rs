//! Scripted [`LlmClient`] for tests and examples.
//!
//! Returns queued responses in order; no network required. Used by the turn
//! engine tests to script tool-call rounds deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LlmClient, LlmError, LlmResponse};
use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

/// Mock model client: pops one scripted response per invocation.
///
/// An exhausted script returns [`LlmError::ResponseFormat`] so a test that
/// over-invokes fails loudly instead of looping.
pub struct MockLlm {
    script: Mutex<VecDeque<LlmResponse>>,
    invocations: AtomicUsize,
}

impl MockLlm {
    /// Creates a mock that replays `responses` in order, one per invocation.
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Creates a mock whose single response is a final answer with no tool calls.
    pub fn final_answer(content: impl Into<String>) -> Self {
        Self::new(vec![LlmResponse {
            content: content.into(),
            tool_calls: Vec::new(),
        }])
    }

    /// Creates a mock that first requests the given tool calls, then answers.
    pub fn tool_round(tool_calls: Vec<ToolCall>, final_content: impl Into<String>) -> Self {
        Self::new(vec![
            LlmResponse {
                content: String::new(),
                tool_calls,
            },
            LlmResponse {
                content: final_content.into(),
                tool_calls: Vec::new(),
            },
        ])
    }

    /// Number of completed invocations so far.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(
        &self,
        _messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<LlmResponse, LlmError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let mut script = self
            .script
            .lock()
            .map_err(|e| LlmError::ResponseFormat(format!("mock script poisoned: {e}")))?;
        script
            .pop_front()
            .ok_or_else(|| LlmError::ResponseFormat("mock script exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Responses replay in order; exhaustion yields ResponseFormat.
    #[tokio::test]
    async fn mock_llm_replays_script_in_order() {
        let llm = MockLlm::new(vec![
            LlmResponse {
                content: "first".into(),
                tool_calls: vec![],
            },
            LlmResponse {
                content: "second".into(),
                tool_calls: vec![],
            },
        ]);
        let a = llm.invoke(&[], &[]).await.unwrap();
        let b = llm.invoke(&[], &[]).await.unwrap();
        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(llm.invocations(), 2);

        let exhausted = llm.invoke(&[], &[]).await;
        assert!(matches!(exhausted, Err(LlmError::ResponseFormat(_))));
    }

    /// **Scenario**: Default invoke_stream emits the final content as one chunk.
    #[tokio::test]
    async fn mock_llm_default_stream_emits_single_chunk() {
        let llm = MockLlm::final_answer("hello");
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let response = llm.invoke_stream(&[], &[], tx).await.unwrap();
        assert_eq!(response.content, "hello");
        let chunk = rx.recv().await.expect("one chunk");
        assert_eq!(chunk.content, "hello");
        assert!(rx.recv().await.is_none());
    }
}
