//! OpenAI-compatible Chat Completions client implementing [`LlmClient`].
//!
//! Works against any endpoint speaking the Chat Completions wire format
//! (OpenAI, Gemini's compatibility layer, local gateways). The wire types and
//! SSE parsing are owned here: requests carry the full history including
//! assistant tool calls and tool-role results, and the streaming path
//! accumulates tool-call fragments by index until the `[DONE]` sentinel.
//!
//! **Interaction**: constructed by the front end from config; consumed by the
//! turn engine through the [`LlmClient`] trait.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;

use super::{LlmClient, LlmError, LlmResponse, MessageChunk};
use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

/// OpenAI-compatible chat client.
pub struct OpenAiChat {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiChat {
    /// Builds a client for the given endpoint, key and model.
    ///
    /// `api_base` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
        }
    }

    /// Set sampling temperature (0–2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Use a custom HTTP client (timeouts, proxies, etc.).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolSpec], stream: bool) -> wire::Request {
        wire::Request {
            model: self.model.clone(),
            messages: messages.iter().map(wire::ChatMessage::from).collect(),
            temperature: self.temperature,
            stream: stream.then_some(true),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(wire::ToolDef::from).collect())
            },
        }
    }

    /// POSTs the request and returns the response with status checked.
    async fn post(&self, request: &wire::Request) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<wire::ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| {
                    if body.is_empty() {
                        "no body".to_string()
                    } else {
                        body
                    }
                });
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl LlmClient for OpenAiChat {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, LlmError> {
        let request = self.build_request(messages, tools, false);
        let response = self.post(&request).await?;
        let body: wire::Response = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseFormat(format!("response decode failed: {e}")))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseFormat("response has no choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }

    async fn invoke_stream(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        chunks: mpsc::Sender<MessageChunk>,
    ) -> Result<LlmResponse, LlmError> {
        let request = self.build_request(messages, tools, true);
        let response = self.post(&request).await?;

        let mut body = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        let mut content = String::new();
        let mut calls = ToolCallAccumulator::default();
        let mut done = false;

        while let Some(next) = body.next().await {
            let bytes =
                next.map_err(|e| LlmError::Transport(format!("stream read failed: {e}")))?;
            buf.extend_from_slice(&bytes);

            // SSE events are separated by a blank line.
            while let Some(pos) = find_event_boundary(&buf) {
                let event: Vec<u8> = buf.drain(..pos + 2).collect();
                let text = String::from_utf8_lossy(&event);
                let Some(data) = extract_data(&text) else {
                    continue;
                };
                if data == "[DONE]" {
                    done = true;
                    break;
                }
                // Unparseable chunks (keep-alives, vendor extras) are skipped.
                let Ok(chunk) = serde_json::from_str::<wire::StreamChunk>(data) else {
                    continue;
                };
                if let Some(choice) = chunk.choices.first() {
                    if let Some(delta) = &choice.delta.content {
                        if !delta.is_empty() {
                            content.push_str(delta);
                            let _ = chunks
                                .send(MessageChunk {
                                    content: delta.clone(),
                                })
                                .await;
                        }
                    }
                    if let Some(deltas) = &choice.delta.tool_calls {
                        calls.apply(deltas);
                    }
                }
            }
            if done {
                break;
            }
        }

        Ok(LlmResponse {
            content,
            tool_calls: calls.finish(),
        })
    }
}

/// Byte offset of the first SSE event separator (`\n\n`), if complete.
fn find_event_boundary(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

/// Extracts the payload of the first `data:` line of an SSE event.
fn extract_data(event: &str) -> Option<&str> {
    event
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
}

/// Accumulates tool-call fragments across stream deltas, keyed by index.
///
/// The first fragment for an index carries the call id and name; later
/// fragments append to the JSON argument string.
#[derive(Default)]
struct ToolCallAccumulator {
    pending: Vec<PendingCall>,
}

struct PendingCall {
    index: u32,
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn apply(&mut self, deltas: &[wire::StreamToolCall]) {
        for delta in deltas {
            let slot = match self.pending.iter_mut().find(|c| c.index == delta.index) {
                Some(slot) => slot,
                None => {
                    self.pending.push(PendingCall {
                        index: delta.index,
                        id: String::new(),
                        name: String::new(),
                        arguments: String::new(),
                    });
                    self.pending
                        .last_mut()
                        .expect("pending call was just pushed")
                }
            };
            if let Some(id) = &delta.id {
                slot.id = id.clone();
            }
            if let Some(function) = &delta.function {
                if let Some(name) = &function.name {
                    slot.name.push_str(name);
                }
                if let Some(arguments) = &function.arguments {
                    slot.arguments.push_str(arguments);
                }
            }
        }
    }

    fn finish(mut self) -> Vec<ToolCall> {
        self.pending.sort_by_key(|c| c.index);
        self.pending
            .into_iter()
            .map(|c| ToolCall {
                id: c.id,
                name: c.name,
                arguments: c.arguments,
            })
            .collect()
    }
}

/// Chat Completions wire format. Mirrors the provider's JSON shapes; not part
/// of the public API.
mod wire {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    use crate::message::{Message, Role};
    use crate::tools::ToolSpec;

    #[derive(Debug, Serialize)]
    pub(super) struct Request {
        pub model: String,
        pub messages: Vec<ChatMessage>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub temperature: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub stream: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tools: Option<Vec<ToolDef>>,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct ChatMessage {
        pub role: &'static str,
        pub content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_calls: Option<Vec<ToolCallOut>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_call_id: Option<String>,
    }

    impl From<&Message> for ChatMessage {
        fn from(m: &Message) -> Self {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };
            // Pure tool-call requests carry null content on the wire.
            let content = if m.content.is_empty() && !m.tool_calls.is_empty() {
                None
            } else {
                Some(m.content.clone())
            };
            let tool_calls = if m.tool_calls.is_empty() {
                None
            } else {
                Some(
                    m.tool_calls
                        .iter()
                        .map(|tc| ToolCallOut {
                            id: tc.id.clone(),
                            call_type: "function",
                            function: FunctionCallOut {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            };
            Self {
                role,
                content,
                tool_calls,
                tool_call_id: m.tool_call_id.clone(),
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub(super) struct ToolCallOut {
        pub id: String,
        #[serde(rename = "type")]
        pub call_type: &'static str,
        pub function: FunctionCallOut,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct FunctionCallOut {
        pub name: String,
        /// JSON string of the arguments.
        pub arguments: String,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct ToolDef {
        #[serde(rename = "type")]
        pub tool_type: &'static str,
        pub function: FunctionDef,
    }

    impl From<&ToolSpec> for ToolDef {
        fn from(spec: &ToolSpec) -> Self {
            Self {
                tool_type: "function",
                function: FunctionDef {
                    name: spec.name.clone(),
                    description: spec.description.clone().unwrap_or_default(),
                    parameters: spec.input_schema.clone(),
                },
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub(super) struct FunctionDef {
        pub name: String,
        pub description: String,
        pub parameters: Value,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Response {
        pub choices: Vec<Choice>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Choice {
        pub message: ResponseMessage,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ResponseMessage {
        pub content: Option<String>,
        pub tool_calls: Option<Vec<ToolCallIn>>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ToolCallIn {
        pub id: String,
        pub function: FunctionCallIn,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct FunctionCallIn {
        pub name: String,
        pub arguments: String,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ErrorResponse {
        pub error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ErrorDetail {
        pub message: String,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct StreamChunk {
        pub choices: Vec<StreamChoice>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct StreamChoice {
        pub delta: StreamDelta,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct StreamDelta {
        pub content: Option<String>,
        pub tool_calls: Option<Vec<StreamToolCall>>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct StreamToolCall {
        pub index: u32,
        pub id: Option<String>,
        pub function: Option<StreamFunctionCall>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct StreamFunctionCall {
        pub name: Option<String>,
        pub arguments: Option<String>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: Request serialization carries tool specs, assistant tool
    /// calls, and tool-result linkage in the provider's wire shape.
    #[test]
    fn request_wire_shape() {
        let chat = OpenAiChat::new("https://api.openai.com/v1", "key", "gpt-4o-mini")
            .with_temperature(0.2);
        let messages = vec![
            Message::user("What is 12 times 7?"),
            Message::assistant_with_calls(
                "",
                vec![ToolCall {
                    id: "call-1".into(),
                    name: "calculator".into(),
                    arguments: r#"{"num1":12,"num2":7,"operation":"mult"}"#.into(),
                }],
            ),
            Message::tool("call-1", r#"{"result":84}"#),
        ];
        let tools = vec![ToolSpec {
            name: "calculator".into(),
            description: Some("Arithmetic on two numbers.".into()),
            input_schema: json!({"type": "object", "properties": {}}),
        }];

        let request = chat.build_request(&messages, &tools, true);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], true);
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "calculator");

        // Assistant tool-call request: null content, typed function call.
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][1]["content"], serde_json::Value::Null);
        assert_eq!(body["messages"][1]["tool_calls"][0]["id"], "call-1");
        assert_eq!(
            body["messages"][1]["tool_calls"][0]["function"]["name"],
            "calculator"
        );
        // Tool result keeps its call-id linkage.
        assert_eq!(body["messages"][2]["role"], "tool");
        assert_eq!(body["messages"][2]["tool_call_id"], "call-1");
    }

    /// **Scenario**: No tools and no stream flag are omitted from the request body.
    #[test]
    fn request_omits_empty_fields() {
        let chat = OpenAiChat::new("https://api.openai.com/v1", "key", "gpt-4o-mini");
        let request = chat.build_request(&[Message::user("hi")], &[], false);
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("stream").is_none());
        assert!(body.get("temperature").is_none());
    }

    /// **Scenario**: Tool-call fragments split across deltas accumulate into
    /// complete calls, ordered by index.
    #[test]
    fn accumulator_joins_fragmented_tool_calls() {
        let deltas1: Vec<_> = serde_json::from_value(json!([
            {"index": 0, "id": "call-a", "function": {"name": "calculator", "arguments": ""}},
            {"index": 1, "id": "call-b", "function": {"name": "search", "arguments": ""}}
        ]))
        .unwrap();
        let deltas2: Vec<_> = serde_json::from_value(json!([
            {"index": 0, "function": {"arguments": "{\"num1\":12,"}},
            {"index": 1, "function": {"arguments": "{\"query\":\"tigers\"}"}}
        ]))
        .unwrap();
        let deltas3: Vec<_> = serde_json::from_value(json!([
            {"index": 0, "function": {"arguments": "\"num2\":7}"}}
        ]))
        .unwrap();

        let mut acc = ToolCallAccumulator::default();
        acc.apply(&deltas1);
        acc.apply(&deltas2);
        acc.apply(&deltas3);
        let calls = acc.finish();

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call-a");
        assert_eq!(calls[0].name, "calculator");
        assert_eq!(calls[0].arguments, "{\"num1\":12,\"num2\":7}");
        assert_eq!(calls[1].id, "call-b");
    }

    /// **Scenario**: SSE framing helpers find event boundaries and data payloads.
    #[test]
    fn sse_framing_helpers() {
        assert_eq!(find_event_boundary(b"data: {}\n\nrest"), Some(8));
        assert_eq!(find_event_boundary(b"data: {"), None);
        assert_eq!(extract_data("data: {\"a\":1}\n"), Some("{\"a\":1}"));
        assert_eq!(extract_data("data: [DONE]\n"), Some("[DONE]"));
        assert_eq!(extract_data(": keep-alive\n"), None);
    }
}
