//! Conversation message model: roles, tool calls, and constructors.
//!
//! A thread's history is an append-only sequence of [`Message`]s, insertion
//! order significant. Tool results are tool-role messages linked back to the
//! originating assistant request by `tool_call_id`. Messages serialize as
//! JSON; this is also the checkpoint persistence format.

use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One tool invocation requested by the model.
///
/// `arguments` holds the JSON-encoded argument object exactly as it was
/// emitted on the wire; it is parsed at dispatch time so a malformed payload
/// degrades to an empty object instead of failing the turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// A single turn's content. Immutable once created.
///
/// **Interaction**: produced by the UI (user), [`LlmClient`](crate::llm::LlmClient)
/// (assistant), and tool dispatch (tool); consumed by the turn engine and the
/// checkpoint store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Message text; may be empty on assistant messages that only request tools.
    #[serde(default)]
    pub content: String,
    /// Tool invocations requested by an assistant message; empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// On tool-role messages, the id of the originating request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::assistant_with_calls(content, Vec::new())
    }

    /// Assistant message that may request tool invocations.
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Tool result linked to its originating call.
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}
