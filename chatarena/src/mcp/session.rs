//! MCP session over Streamable HTTP: POST JSON-RPC to a URL, parse the JSON
//! response.
//!
//! Implements the MCP Streamable HTTP transport for a single server: POST one
//! JSON-RPC message, `Accept: application/json and text/event-stream`,
//! optional `MCP-Session-Id` and `MCP-Protocol-Version` headers. The response
//! must be `Content-Type: application/json` with a single JSON-RPC response.
//!
//! **Interaction**: created by [`register_mcp_tools`](super::register_mcp_tools)
//! at startup; used for `initialize`, `tools/list`, and `tools/call`. Uses
//! async reqwest; safe to create and use from tokio context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::ToolError;

/// MCP protocol version sent on every request.
const MCP_PROTOCOL_VERSION: &str = "2025-06-18";
/// Request id for the initialize handshake.
const INITIALIZE_REQUEST_ID: &str = "chatarena-initialize";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

/// One MCP server session over Streamable HTTP.
///
/// Performs the initialize handshake on connect, then supports
/// request/response for `tools/list` and `tools/call`.
pub struct McpHttpSession {
    client: reqwest::Client,
    url: String,
    /// Extra headers (e.g. an API key) sent on every request.
    headers: Vec<(String, String)>,
    /// Session id from the server's MCP-Session-Id header; echoed on
    /// subsequent requests.
    session_id: Mutex<Option<String>>,
    /// Monotonic request-id counter.
    next_id: AtomicU64,
}

impl McpHttpSession {
    /// Connects to an MCP endpoint and completes the initialize handshake.
    ///
    /// `url` must be the MCP endpoint (e.g. `https://example.com/mcp`);
    /// `headers` are added to every request.
    pub async fn connect(
        url: impl Into<String>,
        headers: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Result<Self, ToolError> {
        let headers: Vec<(String, String)> = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| ToolError::Transport(e.to_string()))?;
        let session = Self {
            client,
            url: url.into(),
            headers,
            session_id: Mutex::new(None),
            next_id: AtomicU64::new(1),
        };
        session.initialize().await?;
        Ok(session)
    }

    /// Builds a POST with the common MCP headers and current session id.
    fn post(&self, body: Vec<u8>) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .header("MCP-Protocol-Version", MCP_PROTOCOL_VERSION)
            .body(body);
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Ok(guard) = self.session_id.lock() {
            if let Some(session_id) = guard.as_ref() {
                request = request.header("MCP-Session-Id", session_id.as_str());
            }
        }
        request
    }

    /// Performs MCP initialize: POST `initialize`, capture `MCP-Session-Id`,
    /// POST `notifications/initialized`.
    async fn initialize(&self) -> Result<(), ToolError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: INITIALIZE_REQUEST_ID,
            method: "initialize",
            params: json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "clientInfo": {
                    "name": "chatarena",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        };
        let body =
            serde_json::to_vec(&request).map_err(|e| ToolError::Transport(e.to_string()))?;
        let response = self
            .post(body)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        let status = response.status();
        if let Some(session_id) = response
            .headers()
            .get("MCP-Session-Id")
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut guard) = self.session_id.lock() {
                *guard = Some(session_id.to_string());
            }
        }
        if status == reqwest::StatusCode::ACCEPTED {
            return Ok(());
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::Transport(format!(
                "initialize HTTP {}: {}",
                status,
                if text.is_empty() { "no body" } else { &text }
            )));
        }
        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Transport(format!("initialize response json: {e}")))?;
        if let Some(error) = body.error {
            return Err(ToolError::Remote(format!(
                "initialize failed ({}): {}",
                error.code, error.message
            )));
        }

        let notification = JsonRpcNotification {
            jsonrpc: "2.0",
            method: "notifications/initialized",
            params: json!({}),
        };
        let body =
            serde_json::to_vec(&notification).map_err(|e| ToolError::Transport(e.to_string()))?;
        let response = self
            .post(body)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;
        let status = response.status();
        if status != reqwest::StatusCode::ACCEPTED && !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::Transport(format!(
                "notifications/initialized HTTP {}: {}",
                status,
                if text.is_empty() { "no body" } else { &text }
            )));
        }
        Ok(())
    }

    /// Sends a JSON-RPC request and returns the parsed result (one POST, one
    /// response). A JSON-RPC error becomes [`ToolError::Remote`].
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ToolError> {
        let id = format!(
            "chatarena-{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        );
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: &id,
            method,
            params,
        };
        let body =
            serde_json::to_vec(&request).map_err(|e| ToolError::Transport(e.to_string()))?;
        let response = self
            .post(body)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ToolError::Transport(format!(
                "{} HTTP {}: {}",
                method,
                status,
                if text.is_empty() { "no body" } else { &text }
            )));
        }
        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Transport(format!("{method} response json: {e}")))?;
        if let Some(error) = body.error {
            return Err(ToolError::Remote(format!(
                "{} failed ({}): {}",
                method, error.code, error.message
            )));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Requests serialize to JSON-RPC 2.0 framing.
    #[test]
    fn request_framing() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: "chatarena-1",
            method: "tools/list",
            params: json!({}),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["id"], "chatarena-1");
        assert_eq!(body["method"], "tools/list");
    }

    /// **Scenario**: Response bodies parse with either result or error present.
    #[test]
    fn response_framing() {
        let ok: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"1","result":{"tools":[]}}"#).unwrap();
        assert!(ok.result.is_some());
        assert!(ok.error.is_none());

        let err: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32601,"message":"no such method"}}"#,
        )
        .unwrap();
        let error = err.error.unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.message, "no such method");
    }
}
