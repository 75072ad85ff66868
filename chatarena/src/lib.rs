//! # ChatArena
//!
//! A conversational-assistant runtime. The [`TurnEngine`] drives the loop for
//! one turn — invoke the model, dispatch any requested tool calls, repeat
//! until the model produces a final answer — and persists each thread's full
//! message history in a [`Checkpointer`] so conversations resume across
//! sessions.
//!
//! ## Main Modules
//!
//! - [`engine`]: `TurnEngine`, `TurnEvent` — run or stream one turn.
//! - [`llm`]: `LlmClient` trait, `OpenAiChat` (OpenAI-compatible chat
//!   completions), `MockLlm` for tests.
//! - [`tools`]: `Tool` trait, `ToolRegistry`, and the built-ins (calculator,
//!   search, stock quotes).
//! - [`mcp`]: remote tool discovery over MCP Streamable HTTP (feature `mcp`).
//! - [`checkpoint`]: thread-keyed persistence — in-memory, SQLite
//!   (feature `sqlite`), PostgreSQL (feature `postgres`).
//! - [`message`]: the `Message`/`ToolCall` data model.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use chatarena::{MemorySaver, MockLlm, ToolRegistry, TurnEngine};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = TurnEngine::new(
//!     Arc::new(MockLlm::final_answer("Hello!")),
//!     Arc::new(ToolRegistry::new()),
//!     Arc::new(MemorySaver::new()),
//! );
//! let history = engine.run("thread-1", "Hi there").await.unwrap();
//! assert_eq!(history.last().unwrap().content, "Hello!");
//! # }
//! ```
//!
//! Wiring for a real deployment — `OpenAiChat` from env config, built-in plus
//! MCP-discovered tools, a SQL-backed saver — lives in `chatarena-cli`.

pub mod checkpoint;
pub mod engine;
pub mod llm;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod message;
pub mod tools;

pub use checkpoint::{CheckpointError, Checkpointer, MemorySaver};
#[cfg(feature = "postgres")]
pub use checkpoint::PostgresSaver;
#[cfg(feature = "sqlite")]
pub use checkpoint::SqliteSaver;
pub use engine::{ToolPhase, TurnEngine, TurnError, TurnEvent, DEFAULT_MAX_ROUNDS};
pub use llm::{LlmClient, LlmError, LlmResponse, MessageChunk, MockLlm, OpenAiChat};
#[cfg(feature = "mcp")]
pub use mcp::{register_mcp_tools, McpHttpSession, McpToolAdapter};
pub use message::{Message, Role, ToolCall};
pub use tools::{
    CalculatorTool, SearchTool, StockPriceTool, Tool, ToolError, ToolRegistry, ToolSpec,
};
