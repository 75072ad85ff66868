//! Remote tool discovery over MCP.
//!
//! Tools hosted by an MCP server are listed once at startup and registered
//! into the same [`ToolRegistry`](crate::tools::ToolRegistry) as the
//! built-ins, each behind a [`McpToolAdapter`] implementing the identical
//! [`Tool`] interface. Discovery failure degrades to an empty remote set —
//! the system continues with built-ins only.

mod session;

pub use session::McpHttpSession;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::tools::{Tool, ToolError, ToolRegistry, ToolSpec};

/// A remote MCP tool exposed through the local [`Tool`] interface.
///
/// `call` forwards to `tools/call` on the owning session and flattens the
/// result's text content. Server-side tool failures (`isError`) come back as
/// result content, matching the in-band error convention of the built-ins.
pub struct McpToolAdapter {
    session: Arc<McpHttpSession>,
    spec: ToolSpec,
}

impl McpToolAdapter {
    pub fn new(session: Arc<McpHttpSession>, spec: ToolSpec) -> Self {
        Self { session, spec }
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let result = self
            .session
            .request(
                "tools/call",
                json!({ "name": self.spec.name, "arguments": args }),
            )
            .await?;
        Ok(flatten_call_result(&result))
    }
}

/// Lists the server's tools and wraps each in an adapter.
pub async fn discover_tools(
    session: Arc<McpHttpSession>,
) -> Result<Vec<McpToolAdapter>, ToolError> {
    let result = session.request("tools/list", json!({})).await?;
    let specs = parse_tool_list(&result)?;
    Ok(specs
        .into_iter()
        .map(|spec| McpToolAdapter::new(Arc::clone(&session), spec))
        .collect())
}

/// Connects to `url`, discovers its tools, and registers them. Returns the
/// number registered; any failure degrades to zero with a warning so startup
/// continues with built-ins only.
pub async fn register_mcp_tools(
    registry: &mut ToolRegistry,
    url: &str,
    headers: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
) -> usize {
    let session = match McpHttpSession::connect(url, headers).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            warn!(url, error = %e, "MCP connect failed; continuing with built-in tools only");
            return 0;
        }
    };
    match discover_tools(session).await {
        Ok(adapters) => {
            let count = adapters.len();
            for adapter in adapters {
                debug!(tool = adapter.name(), "registered remote tool");
                registry.register(Arc::new(adapter));
            }
            count
        }
        Err(e) => {
            warn!(url, error = %e, "MCP tool listing failed; continuing with built-in tools only");
            0
        }
    }
}

/// Parses a `tools/list` result into specs.
fn parse_tool_list(result: &Value) -> Result<Vec<ToolSpec>, ToolError> {
    let tools = result
        .get("tools")
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::Remote("tools/list result has no tools array".to_string()))?;
    let mut specs = Vec::with_capacity(tools.len());
    for tool in tools {
        let name = tool
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::Remote("listed tool has no name".to_string()))?;
        specs.push(ToolSpec {
            name: name.to_string(),
            description: tool
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            input_schema: tool
                .get("inputSchema")
                .cloned()
                .unwrap_or_else(|| json!({ "type": "object" })),
        });
    }
    Ok(specs)
}

/// Flattens a `tools/call` result to text: text content blocks joined by
/// newlines, or the raw result JSON when no text blocks are present.
fn flatten_call_result(result: &Value) -> String {
    let texts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if texts.is_empty() {
        result.to_string()
    } else {
        texts.join("\n")
    }
}
