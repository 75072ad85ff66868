//! Turn engine: the tool-calling loop between model and tool registry, with
//! durable thread state.
//!
//! One turn takes a user message through `AwaitingModel` ⇄ `DispatchingTools`
//! until the model answers without tool calls (`Done`), then checkpoints the
//! full history keyed by thread id. Aborted turns — model failure, round cap,
//! cancellation — do not persist, so the thread's last checkpoint stays the
//! recovery point.
//!
//! The engine owns nothing global: the model client, the registry, and the
//! checkpointer are passed in at construction and shared by `Arc`.

mod events;

pub use events::{ToolPhase, TurnEvent};

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::checkpoint::{CheckpointError, Checkpointer};
use crate::llm::{LlmClient, LlmError, LlmResponse, MessageChunk};
use crate::message::{Message, ToolCall};
use crate::tools::ToolRegistry;

/// Default cap on model invocations per turn, preventing runaway
/// tool-calling loops.
pub const DEFAULT_MAX_ROUNDS: usize = 25;

/// Why a turn aborted. Tool-level problems never appear here — they are fed
/// back to the model as result content instead.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("model invocation failed: {0}")]
    Llm(#[from] LlmError),
    #[error("checkpoint failed: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("model kept requesting tools for {0} rounds without answering")]
    RoundLimitExceeded(usize),
    #[error("turn cancelled")]
    Cancelled,
}

/// Loop phase of an in-flight turn.
enum TurnPhase {
    AwaitingModel,
    DispatchingTools(Vec<ToolCall>),
    Done,
}

/// Drives conversation turns for any thread.
///
/// Cloning is cheap; all state is shared behind `Arc`. One turn runs
/// sequentially (model → tools → model → …); nothing here coordinates
/// concurrent turns on the *same* thread — that is the front end's
/// single-session-per-thread discipline.
#[derive(Clone)]
pub struct TurnEngine {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    checkpointer: Arc<dyn Checkpointer>,
    system_prompt: Option<String>,
    max_rounds: usize,
}

impl TurnEngine {
    /// Creates an engine from its three collaborators.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        Self {
            llm,
            tools,
            checkpointer,
            system_prompt: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Injects a system prompt as the first message of each new thread.
    /// Existing threads are never rewritten.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Overrides the per-turn cap on model invocations.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// The registry this engine dispatches against.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The checkpoint store backing this engine. The front end uses it for
    /// `load`/`list_threads` when rendering its thread sidebar.
    pub fn checkpointer(&self) -> Arc<dyn Checkpointer> {
        Arc::clone(&self.checkpointer)
    }

    /// Runs one turn to completion and returns the full updated history.
    pub async fn run(
        &self,
        thread_id: &str,
        user_message: &str,
    ) -> Result<Vec<Message>, TurnError> {
        self.run_turn(thread_id, user_message, None, &CancellationToken::new())
            .await
    }

    /// Runs one turn, emitting [`TurnEvent`]s as they occur. The stream ends
    /// with `Completed` (history already checkpointed) or `Failed`; a
    /// cancelled turn ends the stream with no terminal event.
    pub fn stream(&self, thread_id: &str, user_message: &str) -> ReceiverStream<TurnEvent> {
        self.stream_with_cancel(thread_id, user_message, CancellationToken::new())
    }

    /// Streaming run with an externally owned cancellation token. Cancelling
    /// (or dropping the receiver) stops the producer before its next model or
    /// tool call; a cancelled turn is not persisted.
    pub fn stream_with_cancel(
        &self,
        thread_id: &str,
        user_message: &str,
        cancel: CancellationToken,
    ) -> ReceiverStream<TurnEvent> {
        let (tx, rx) = mpsc::channel(128);
        let engine = self.clone();
        let thread_id = thread_id.to_string();
        let user_message = user_message.to_string();

        tokio::spawn(async move {
            let result = engine
                .run_turn(&thread_id, &user_message, Some(tx.clone()), &cancel)
                .await;
            match result {
                Ok(messages) => {
                    let _ = tx.send(TurnEvent::Completed { messages }).await;
                }
                Err(TurnError::Cancelled) => {}
                Err(e) => {
                    let _ = tx.send(TurnEvent::Failed {
                        error: e.to_string(),
                    })
                    .await;
                }
            }
        });

        ReceiverStream::new(rx)
    }

    /// Streaming run that drains events through `on_event` and returns the
    /// final history. `on_event` sees `Content` and `ToolStatus` events; the
    /// outcome arrives as the return value.
    pub async fn stream_with_callback<F>(
        &self,
        thread_id: &str,
        user_message: &str,
        mut on_event: F,
    ) -> Result<Vec<Message>, TurnError>
    where
        F: FnMut(TurnEvent),
    {
        let (tx, mut rx) = mpsc::channel(128);
        let cancel = CancellationToken::new();
        let run = self.run_turn(thread_id, user_message, Some(tx), &cancel);
        tokio::pin!(run);

        let mut outcome: Option<Result<Vec<Message>, TurnError>> = None;
        loop {
            tokio::select! {
                result = &mut run, if outcome.is_none() => outcome = Some(result),
                event = rx.recv() => match event {
                    Some(event) => on_event(event),
                    // Channel closes once the run future (the only sender) is done.
                    None => break,
                },
            }
        }
        outcome.unwrap_or(Err(TurnError::Cancelled))
    }

    /// The turn state machine shared by all modes.
    async fn run_turn(
        &self,
        thread_id: &str,
        user_message: &str,
        events: Option<mpsc::Sender<TurnEvent>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Message>, TurnError> {
        let mut messages = self.checkpointer.load(thread_id).await?;
        if messages.is_empty() {
            if let Some(prompt) = &self.system_prompt {
                messages.push(Message::system(prompt.clone()));
            }
        }
        messages.push(Message::user(user_message));

        let specs = self.tools.specs();
        let mut rounds = 0usize;
        let mut phase = TurnPhase::AwaitingModel;

        loop {
            phase = match phase {
                TurnPhase::AwaitingModel => {
                    if cancel.is_cancelled() {
                        return Err(TurnError::Cancelled);
                    }
                    if rounds >= self.max_rounds {
                        warn!(thread_id, rounds, "round cap hit; aborting turn");
                        return Err(TurnError::RoundLimitExceeded(self.max_rounds));
                    }
                    rounds += 1;

                    let response = self
                        .invoke_model(&messages, &specs, events.as_ref(), cancel)
                        .await?;
                    let next = if response.tool_calls.is_empty() {
                        TurnPhase::Done
                    } else {
                        TurnPhase::DispatchingTools(response.tool_calls.clone())
                    };
                    messages.push(Message::assistant_with_calls(
                        response.content,
                        response.tool_calls,
                    ));
                    next
                }
                TurnPhase::DispatchingTools(calls) => {
                    // Request order is preserved; one tool-role message per
                    // call, before the next model invocation.
                    for call in &calls {
                        if cancel.is_cancelled() {
                            return Err(TurnError::Cancelled);
                        }
                        emit(
                            events.as_ref(),
                            TurnEvent::ToolStatus {
                                tool_name: call.name.clone(),
                                phase: ToolPhase::Started,
                            },
                        )
                        .await?;
                        let content = self.dispatch(call).await;
                        messages.push(Message::tool(call.id.clone(), content));
                        emit(
                            events.as_ref(),
                            TurnEvent::ToolStatus {
                                tool_name: call.name.clone(),
                                phase: ToolPhase::Finished,
                            },
                        )
                        .await?;
                    }
                    TurnPhase::AwaitingModel
                }
                TurnPhase::Done => break,
            };
        }

        self.checkpointer.save(thread_id, &messages).await?;
        Ok(messages)
    }

    /// One model invocation, streaming content fragments when an event
    /// channel is present, raced against cancellation.
    async fn invoke_model(
        &self,
        messages: &[Message],
        specs: &[crate::tools::ToolSpec],
        events: Option<&mpsc::Sender<TurnEvent>>,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, TurnError> {
        let invocation = async {
            match events {
                Some(tx) => {
                    let (chunk_tx, mut chunk_rx) = mpsc::channel::<MessageChunk>(128);
                    let events_tx = tx.clone();
                    let forward = tokio::spawn(async move {
                        while let Some(chunk) = chunk_rx.recv().await {
                            if events_tx
                                .send(TurnEvent::Content {
                                    text: chunk.content,
                                })
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                    });
                    let result = self.llm.invoke_stream(messages, specs, chunk_tx).await;
                    let _ = forward.await;
                    result
                }
                None => self.llm.invoke(messages, specs).await,
            }
        };

        tokio::select! {
            result = invocation => Ok(result?),
            _ = cancel.cancelled() => Err(TurnError::Cancelled),
        }
    }

    /// Resolves and executes one requested call. Failures never abort the
    /// turn: an unknown name or a failed invocation becomes the result
    /// content so the model can react on the next round.
    async fn dispatch(&self, call: &ToolCall) -> String {
        let args: serde_json::Value = if call.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&call.arguments).unwrap_or_else(|_| serde_json::json!({}))
        };

        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, "requested tool is not registered");
            return serde_json::json!({
                "error": format!("tool '{}' is not available", call.name)
            })
            .to_string();
        };

        debug!(tool = %call.name, args = ?args, "dispatching tool");
        match tool.call(args).await {
            Ok(content) => {
                trace!(tool = %call.name, result_len = content.len(), "tool returned");
                content
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                serde_json::json!({ "error": e.to_string() }).to_string()
            }
        }
    }
}

/// Sends an event; a dropped receiver means the consumer walked away, which
/// cancels the turn.
async fn emit(
    events: Option<&mpsc::Sender<TurnEvent>>,
    event: TurnEvent,
) -> Result<(), TurnError> {
    if let Some(tx) = events {
        if tx.send(event).await.is_err() {
            return Err(TurnError::Cancelled);
        }
    }
    Ok(())
}
