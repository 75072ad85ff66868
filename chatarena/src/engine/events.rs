//! Streaming surface consumed by the UI.
//!
//! The turn engine produces a strictly ordered, finite, non-restartable
//! sequence of these events over a bounded channel; the consumer renders them
//! in arrival order. Events carry no persisted state.

use crate::message::Message;

/// Phase marker bracketing one tool dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPhase {
    Started,
    Finished,
}

/// One event in a streamed turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Fragment of assistant content, in arrival order.
    Content { text: String },
    /// Progress affordance around a tool dispatch.
    ToolStatus {
        tool_name: String,
        phase: ToolPhase,
    },
    /// Terminal: the turn completed cleanly; carries the full updated history
    /// (already checkpointed).
    Completed { messages: Vec<Message> },
    /// Terminal: the turn aborted; the thread is left at its last checkpoint.
    Failed { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Event variants carry their data and compare by value.
    #[test]
    fn turn_event_variants_hold_data() {
        let content = TurnEvent::Content {
            text: "84".into(),
        };
        assert_eq!(
            content,
            TurnEvent::Content {
                text: "84".into()
            }
        );

        let status = TurnEvent::ToolStatus {
            tool_name: "calculator".into(),
            phase: ToolPhase::Started,
        };
        match status {
            TurnEvent::ToolStatus { tool_name, phase } => {
                assert_eq!(tool_name, "calculator");
                assert_eq!(phase, ToolPhase::Started);
            }
            other => panic!("expected ToolStatus, got {other:?}"),
        }
    }
}
