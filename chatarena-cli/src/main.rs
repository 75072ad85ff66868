//! ChatArena binary: chat with a tool-calling assistant; conversations
//! persist per thread and resume across sessions.

use clap::Parser;
use uuid::Uuid;

use chatarena_cli::{app, CliConfig};

#[derive(Parser, Debug)]
#[command(name = "chatarena")]
#[command(about = "Chat with a tool-calling assistant; conversations persist per thread")]
struct Args {
    /// Message to send (also accepted as positional words)
    #[arg(short, long, value_name = "TEXT")]
    message: Option<String>,

    /// Positional message words (when -m/--message is not used)
    #[arg(trailing_var_arg = true)]
    rest: Vec<String>,

    /// Thread to resume; a fresh thread id is generated when omitted
    #[arg(short, long, value_name = "ID")]
    thread: Option<String>,

    /// List known threads with labels and exit
    #[arg(long)]
    list_threads: bool,

    /// Read messages from stdin until EOF, one turn per line
    #[arg(short, long)]
    interactive: bool,

    /// Print the final answer in one piece instead of streaming
    #[arg(long)]
    no_stream: bool,

    /// Show debug logs
    #[arg(short, long)]
    verbose: bool,
}

fn get_message(args: &Args) -> Option<String> {
    if let Some(ref m) = args.message {
        return Some(m.clone());
    }
    if args.rest.is_empty() {
        None
    } else {
        Some(args.rest.join(" ").trim().to_string())
    }
}

/// Load .env from the current directory; if not found, try the parent
/// (workspace root when run from a crate dir).
fn load_dotenv() {
    if dotenv::dotenv().is_ok() {
        return;
    }
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(parent) = cwd.parent() {
            let env_path = parent.join(".env");
            if env_path.is_file() {
                let _ = dotenv::from_path(env_path);
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "chatarena=debug,chatarena_cli=debug,warn"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<(), app::Error> {
    let config = CliConfig::from_env()?;
    let engine = app::build_engine(&config).await?;

    if args.list_threads {
        return app::print_threads(&engine).await;
    }

    let thread_id = args
        .thread
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    println!("[thread {thread_id}]");

    if args.interactive {
        return app::repl(&engine, &thread_id, !args.no_stream).await;
    }

    let Some(message) = get_message(&args) else {
        return Err("no message given (pass text, or use --interactive)".into());
    };
    app::run_turn(&engine, &thread_id, &message, !args.no_stream).await
}

#[tokio::main]
async fn main() {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
