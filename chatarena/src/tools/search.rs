//! Web search tool backed by the DuckDuckGo instant-answer API.
//!
//! An opaque side-effecting external call: the raw response body is handed
//! back as the result content, with no retry policy.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolError, ToolSpec};

/// Tool name for web search.
pub const TOOL_SEARCH: &str = "search";

const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com/";

pub struct SearchTool {
    client: reqwest::Client,
    base_url: String,
}

impl Default for SearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DUCKDUCKGO_URL.to_string(),
        }
    }

    /// Use a custom HTTP client (timeouts, proxies, etc.).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Point at a different endpoint (e.g. a local stub in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        TOOL_SEARCH
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_SEARCH.to_string(),
            description: Some(
                "Search the web for current information. Returns raw search results for the \
                 given query."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The search query." }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidInput("missing 'query'".to_string()))?;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("no_redirect", "1"),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Transport(format!("search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolError::Transport(format!(
                "search request failed with status: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ToolError::Transport(format!("failed to read search response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Spec declares the single required "query" argument.
    #[test]
    fn spec_declares_query() {
        let spec = SearchTool::new().spec();
        assert_eq!(spec.name, "search");
        assert_eq!(spec.input_schema["required"][0], "query");
    }

    /// **Scenario**: A missing query is rejected before any network I/O.
    #[tokio::test]
    async fn missing_query_is_invalid_input() {
        let err = SearchTool::new().call(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
