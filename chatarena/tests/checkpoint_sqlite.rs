//! Integration tests for the SQLite checkpoint backend: durability across
//! reopen, round-trip fidelity, and the listing contract.
#![cfg(feature = "sqlite")]

use chatarena::{Checkpointer, Message, Role, SqliteSaver, ToolCall};

fn sample_history() -> Vec<Message> {
    vec![
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
        Message::assistant("12 times 7 is 84."),
    ]
}

/// **Scenario**: load(save(T, M)) returns exactly M, including tool calls and
/// call-id linkage.
#[tokio::test]
async fn save_load_roundtrip_preserves_tool_linkage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatarena.db");
    let saver = SqliteSaver::new(path.to_str().unwrap()).await.unwrap();

    let history = sample_history();
    saver.save("t1", &history).await.unwrap();
    let loaded = saver.load("t1").await.unwrap();

    assert_eq!(loaded, history);
    assert_eq!(loaded[1].tool_calls[0].name, "calculator");
    assert_eq!(loaded[2].tool_call_id.as_deref(), Some("call-1"));
    assert_eq!(loaded[2].role, Role::Tool);
}

/// **Scenario**: Checkpoints survive closing and reopening the store.
#[tokio::test]
async fn checkpoints_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatarena.db");
    let history = sample_history();

    {
        let saver = SqliteSaver::new(path.to_str().unwrap()).await.unwrap();
        saver.save("t1", &history).await.unwrap();
    }

    let reopened = SqliteSaver::new(path.to_str().unwrap()).await.unwrap();
    assert_eq!(reopened.load("t1").await.unwrap(), history);
}

/// **Scenario**: list_threads is empty before any save; after saving "t1" it
/// contains "t1" and only "t1".
#[tokio::test]
async fn list_threads_empty_then_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatarena.db");
    let saver = SqliteSaver::new(path.to_str().unwrap()).await.unwrap();

    assert!(saver.list_threads().await.unwrap().is_empty());
    saver.save("t1", &[Message::user("hi")]).await.unwrap();
    assert_eq!(saver.list_threads().await.unwrap(), vec!["t1".to_string()]);
}

/// **Scenario**: Saving a thread twice overwrites in place — one row, latest
/// content.
#[tokio::test]
async fn save_is_idempotent_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatarena.db");
    let saver = SqliteSaver::new(path.to_str().unwrap()).await.unwrap();

    saver.save("t1", &[Message::user("first")]).await.unwrap();
    let updated = vec![Message::user("first"), Message::assistant("reply")];
    saver.save("t1", &updated).await.unwrap();

    assert_eq!(saver.load("t1").await.unwrap(), updated);
    assert_eq!(saver.list_threads().await.unwrap().len(), 1);
}

/// **Scenario**: Loading an unknown thread is an empty sequence, not an error.
#[tokio::test]
async fn unknown_thread_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatarena.db");
    let saver = SqliteSaver::new(path.to_str().unwrap()).await.unwrap();
    assert!(saver.load("never-saved").await.unwrap().is_empty());
}

/// **Scenario**: Saves to different threads do not interfere.
#[tokio::test]
async fn threads_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatarena.db");
    let saver = SqliteSaver::new(path.to_str().unwrap()).await.unwrap();

    saver.save("t1", &[Message::user("one")]).await.unwrap();
    saver.save("t2", &[Message::user("two")]).await.unwrap();

    assert_eq!(saver.load("t1").await.unwrap()[0].content, "one");
    assert_eq!(saver.load("t2").await.unwrap()[0].content, "two");
    let mut threads = saver.list_threads().await.unwrap();
    threads.sort();
    assert_eq!(threads, vec!["t1".to_string(), "t2".to_string()]);
}

/// **Scenario**: The connectivity probe succeeds on a healthy store.
#[tokio::test]
async fn ping_succeeds_on_open_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatarena.db");
    let saver = SqliteSaver::new(path.to_str().unwrap()).await.unwrap();
    saver.ping().await.unwrap();
}
