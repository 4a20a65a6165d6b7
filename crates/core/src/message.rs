//! Conversation history items.
//!
//! A run's history is an ordered, append-only sequence of [`Message`]s. The
//! order is semantically significant: it is exactly what is replayed to the
//! model on the next turn. Response content is modeled as a tagged variant
//! so the loop can exhaustively match on kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::ToolCall;

/// A single item in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Input provided by the caller.
    User {
        id: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// A model turn: text and/or requested tool calls.
    Assistant {
        id: String,
        /// Name of the agent that produced this turn.
        agent: String,
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
        timestamp: DateTime<Utc>,
    },

    /// The resolved result of one tool call, appended before the next model
    /// call in the same order the calls were requested.
    ToolResult {
        id: String,
        call_id: String,
        tool_name: String,
        content: String,
        #[serde(default)]
        is_error: bool,
        timestamp: DateTime<Utc>,
    },

    /// Marker recording a transfer of control between agents. History before
    /// the marker is preserved; subsequent turns belong to `to`.
    Handoff {
        id: String,
        from: String,
        to: String,
        /// Tool calls that accompanied the hand-off in the same response and
        /// were therefore not executed.
        #[serde(default)]
        skipped_tool_calls: usize,
        timestamp: DateTime<Utc>,
    },
}

impl Message {
    /// Create a user input message.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant text message with no tool calls.
    pub fn assistant(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Assistant {
            id: Uuid::new_v4().to_string(),
            agent: agent.into(),
            content: content.into(),
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message carrying requested tool calls.
    pub fn assistant_with_calls(
        agent: impl Into<String>,
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Message::Assistant {
            id: Uuid::new_v4().to_string(),
            agent: agent.into(),
            content: content.into(),
            tool_calls,
            timestamp: Utc::now(),
        }
    }

    /// Create a successful tool result.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::ToolResult {
            id: Uuid::new_v4().to_string(),
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    /// Create a tool result recording a per-call failure. The content is fed
    /// back to the model, which decides how to react.
    pub fn tool_error(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::ToolResult {
            id: Uuid::new_v4().to_string(),
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            is_error: true,
            timestamp: Utc::now(),
        }
    }

    /// Create a hand-off marker.
    pub fn handoff(
        from: impl Into<String>,
        to: impl Into<String>,
        skipped_tool_calls: usize,
    ) -> Self {
        Message::Handoff {
            id: Uuid::new_v4().to_string(),
            from: from.into(),
            to: to.into(),
            skipped_tool_calls,
            timestamp: Utc::now(),
        }
    }

    /// Stable identifier of this item.
    pub fn id(&self) -> &str {
        match self {
            Message::User { id, .. }
            | Message::Assistant { id, .. }
            | Message::ToolResult { id, .. }
            | Message::Handoff { id, .. } => id,
        }
    }

    /// Short kind label, useful in logs and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::ToolResult { .. } => "tool_result",
            Message::Handoff { .. } => "handoff",
        }
    }

    /// Text content, if this item carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Message::User { content, .. }
            | Message::Assistant { content, .. }
            | Message::ToolResult { content, .. } => Some(content),
            Message::Handoff { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_message_round_trips() {
        let msg = Message::user("Hello, runtime!");
        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(encoded.contains(r#""type":"user""#));

        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.text(), Some("Hello, runtime!"));
        assert_eq!(decoded.kind(), "user");
    }

    #[test]
    fn assistant_skips_empty_tool_calls_field() {
        let msg = Message::assistant("triage", "All set.");
        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(!encoded.contains("tool_calls"));
    }

    #[test]
    fn assistant_with_calls_serializes_calls() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "calculator".into(),
            arguments: json!({"expression": "2+2"}),
        };
        let msg = Message::assistant_with_calls("triage", "", vec![call]);
        let encoded = serde_json::to_string(&msg).unwrap();
        assert!(encoded.contains("calculator"));
    }

    #[test]
    fn tool_error_sets_flag() {
        let msg = Message::tool_error("call_1", "calculator", "Error: division by zero");
        match msg {
            Message::ToolResult { is_error, .. } => assert!(is_error),
            other => panic!("expected tool result, got {}", other.kind()),
        }
    }

    #[test]
    fn handoff_marker_has_no_text() {
        let msg = Message::handoff("triage", "billing", 2);
        assert_eq!(msg.text(), None);
        assert_eq!(msg.kind(), "handoff");
        match msg {
            Message::Handoff { skipped_tool_calls, .. } => assert_eq!(skipped_tool_calls, 2),
            _ => unreachable!(),
        }
    }
}
