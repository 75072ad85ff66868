//! Engine wiring and terminal rendering.
//!
//! Builds the turn engine from [`CliConfig`] — model client, built-in tools,
//! remote MCP discovery, checkpoint backend chosen by `DATABASE_URL` scheme —
//! and renders turns: streamed content as it arrives, `[tool]` status lines
//! bracketing each dispatch, thread labels for the listing.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tracing::info;

use chatarena::{
    register_mcp_tools, CalculatorTool, Checkpointer, MemorySaver, Message, OpenAiChat,
    PostgresSaver, Role, SearchTool, SqliteSaver, StockPriceTool, ToolPhase, ToolRegistry,
    TurnEngine, TurnEvent,
};

use crate::config::CliConfig;

/// Error type for front-end operations.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Max label length in the thread listing.
const LABEL_LEN: usize = 25;

/// Checkpoint backend selected by `DATABASE_URL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Sqlite,
    Postgres,
}

/// Picks the backend for a database URL: `postgres://` (or `postgresql://`)
/// routes to Postgres, anything else set is a SQLite path, unset is
/// in-memory.
pub fn backend_kind(database_url: Option<&str>) -> BackendKind {
    match database_url {
        None => BackendKind::Memory,
        Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
            BackendKind::Postgres
        }
        Some(_) => BackendKind::Sqlite,
    }
}

/// Opens the configured checkpoint store and verifies connectivity.
pub async fn open_checkpointer(
    database_url: Option<&str>,
) -> Result<Arc<dyn Checkpointer>, Error> {
    let checkpointer: Arc<dyn Checkpointer> = match database_url {
        None => Arc::new(MemorySaver::new()),
        Some(url) => match backend_kind(Some(url)) {
            BackendKind::Postgres => Arc::new(PostgresSaver::connect(url).await?),
            _ => {
                let path = url.strip_prefix("sqlite://").unwrap_or(url);
                Arc::new(SqliteSaver::new(path).await?)
            }
        },
    };
    checkpointer.ping().await?;
    Ok(checkpointer)
}

/// Assembles the turn engine: model client, tool registry (built-ins plus
/// remote MCP discovery), and checkpoint store.
pub async fn build_engine(config: &CliConfig) -> Result<TurnEngine, Error> {
    let mut llm = OpenAiChat::new(&config.api_base, &config.api_key, &config.model);
    if let Some(temperature) = config.temperature {
        llm = llm.with_temperature(temperature);
    }

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CalculatorTool));
    registry.register(Arc::new(SearchTool::new()));
    if let Some(key) = &config.stock_api_key {
        registry.register(Arc::new(StockPriceTool::new(key)));
    }
    if let Some(url) = &config.mcp_server_url {
        let count = register_mcp_tools(&mut registry, url, Vec::<(String, String)>::new()).await;
        info!(count, url = url.as_str(), "remote tool discovery finished");
    }

    let checkpointer = open_checkpointer(config.database_url.as_deref()).await?;

    Ok(TurnEngine::new(
        Arc::new(llm),
        Arc::new(registry),
        checkpointer,
    ))
}

/// Shortens a label for the thread listing.
pub fn truncate_label(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

/// Display label for a thread: its first user message, else the id.
pub fn thread_label(thread_id: &str, messages: &[Message]) -> String {
    messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| truncate_label(&m.content, LABEL_LEN))
        .unwrap_or_else(|| truncate_label(thread_id, LABEL_LEN))
}

/// Prints every known thread with its label.
pub async fn print_threads(engine: &TurnEngine) -> Result<(), Error> {
    let checkpointer = engine.checkpointer();
    let threads = checkpointer.list_threads().await?;
    if threads.is_empty() {
        println!("no threads yet");
        return Ok(());
    }
    for thread_id in threads {
        let messages = checkpointer.load(&thread_id).await?;
        println!("{thread_id}  {}", thread_label(&thread_id, &messages));
    }
    Ok(())
}

/// Runs one turn and renders it: streamed by default, whole answer with
/// `stream = false`.
pub async fn run_turn(
    engine: &TurnEngine,
    thread_id: &str,
    message: &str,
    stream: bool,
) -> Result<(), Error> {
    if stream {
        engine
            .stream_with_callback(thread_id, message, print_event)
            .await?;
        println!();
    } else {
        let history = engine.run(thread_id, message).await?;
        if let Some(reply) = history.iter().rev().find(|m| m.role == Role::Assistant) {
            println!("{}", reply.content);
        }
    }
    Ok(())
}

/// Reads messages from stdin until EOF (or `exit`/`quit`), one turn per line.
pub async fn repl(engine: &TurnEngine, thread_id: &str, stream: bool) -> Result<(), Error> {
    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        // A failed turn reports and keeps the session alive; the thread's
        // last checkpoint is intact.
        if let Err(e) = run_turn(engine, thread_id, line, stream).await {
            eprintln!("error: {e}");
        }
    }
    Ok(())
}

fn print_event(event: TurnEvent) {
    match event {
        TurnEvent::Content { text } => {
            print!("{text}");
            let _ = io::stdout().flush();
        }
        TurnEvent::ToolStatus {
            tool_name,
            phase: ToolPhase::Started,
        } => println!("[tool] {tool_name} ..."),
        TurnEvent::ToolStatus {
            tool_name,
            phase: ToolPhase::Finished,
        } => println!("[tool] {tool_name} done"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatarena::Message;

    /// **Scenario**: URL schemes route to the right checkpoint backend.
    #[test]
    fn backend_kind_routes_by_scheme() {
        assert_eq!(backend_kind(None), BackendKind::Memory);
        assert_eq!(
            backend_kind(Some("postgres://localhost/chatarena")),
            BackendKind::Postgres
        );
        assert_eq!(
            backend_kind(Some("postgresql://localhost/chatarena")),
            BackendKind::Postgres
        );
        assert_eq!(backend_kind(Some("chatarena.db")), BackendKind::Sqlite);
        assert_eq!(
            backend_kind(Some("sqlite://chatarena.db")),
            BackendKind::Sqlite
        );
    }

    /// **Scenario**: Long labels are truncated to 25 chars with an ellipsis.
    #[test]
    fn labels_truncate_like_the_sidebar() {
        assert_eq!(truncate_label("short", 25), "short");
        let long = "Generate a 200 word essay about tigers";
        let label = truncate_label(long, 25);
        assert_eq!(label.chars().count(), 25);
        assert!(label.ends_with("..."));
    }

    /// **Scenario**: The thread label is the first user message; system
    /// prompts are skipped and empty threads fall back to the id.
    #[test]
    fn thread_label_prefers_first_user_message() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("What is 12 times 7?"),
            Message::assistant("84."),
        ];
        assert_eq!(thread_label("t1", &messages), "What is 12 times 7?");
        assert_eq!(thread_label("t1", &[]), "t1");
    }
}
