//! Tool capability surface: the [`Tool`] trait, the specs handed to the
//! model, and the name-keyed [`ToolRegistry`].
//!
//! Built-ins cover arithmetic ([`CalculatorTool`]), web search
//! ([`SearchTool`]) and stock quotes ([`StockPriceTool`]); remote MCP tools
//! register through the same trait (see [`crate::mcp`]).

mod calculator;
mod registry;
mod search;
mod stock;

pub use calculator::CalculatorTool;
pub use registry::ToolRegistry;
pub use search::SearchTool;
pub use stock::StockPriceTool;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Tool invocation failure.
///
/// Reserved for invocation-level faults (bad arguments, transport, remote
/// protocol errors). Failures the model should see and react to — division by
/// zero, an empty search — are returned as ordinary result content instead.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote tool error: {0}")]
    Remote(String),
}

/// Description of a callable capability as presented to the model.
///
/// Fields align with the tool schema of the chat-completions wire format and
/// the MCP `tools/list` result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    /// JSON schema of the argument object.
    pub input_schema: Value,
}

/// A callable capability, registered by name.
///
/// **Interaction**: [`ToolRegistry`] owns the name → tool table; the turn
/// engine resolves each requested call and appends the returned content as a
/// tool-role message.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name; the key the model uses to request this tool.
    fn name(&self) -> &str;

    /// Spec handed to the model (name, description, argument schema).
    fn spec(&self) -> ToolSpec;

    /// Executes with the parsed argument object, returning result content as
    /// text (structured values serialized to JSON).
    async fn call(&self, args: Value) -> Result<String, ToolError>;
}
