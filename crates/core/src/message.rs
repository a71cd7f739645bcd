//! Message and Conversation domain types.
//!
//! A `Conversation` is the authoritative, append-only log of one agent's
//! research session. The context window manager derives ephemeral trimmed
//! projections from it for outbound reasoning-engine calls; the log itself
//! is never destructively rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content prefix of the synthetic system message that replaces dropped
/// middle messages during context compression. Kept stable so the window
/// manager can recognise its own output and stay idempotent.
pub const COMPRESSION_MARKER_PREFIX: &str = "[Context compressed:";

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (task, clarifications, continuations)
    User,
    /// The reasoning engine
    Assistant,
    /// System instructions and compression markers
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation. Immutable once appended;
/// insertion order is conversation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message carrying tool calls.
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<MessageToolCall>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Create the synthetic marker that stands in for removed middle
    /// messages. Compression is visible and auditable, never silent loss.
    pub fn compression_marker(removed: usize) -> Self {
        Self::new(
            Role::System,
            format!("{COMPRESSION_MARKER_PREFIX} {removed} intermediate messages removed to fit the context window]"),
        )
    }

    /// Whether this message is a compression marker produced by
    /// [`Message::compression_marker`].
    pub fn is_compression_marker(&self) -> bool {
        self.role == Role::System && self.content.starts_with(COMPRESSION_MARKER_PREFIX)
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as a JSON string
    pub arguments: String,
}

impl MessageToolCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// An ordered, append-only sequence of messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Ordered messages
    pub messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was appended
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Research Rust async runtimes");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Research Rust async runtimes");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn conversation_preserves_append_order() {
        let mut conv = Conversation::new();
        conv.push(Message::user("first"));
        conv.push(Message::assistant("second"));
        conv.push(Message::user("third"));

        let contents: Vec<_> = conv.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn compression_marker_is_recognisable() {
        let marker = Message::compression_marker(12);
        assert!(marker.is_compression_marker());
        assert!(marker.content.contains("12"));

        let plain = Message::system("You are a research agent.");
        assert!(!plain.is_compression_marker());
    }

    #[test]
    fn tool_result_links_to_call() {
        let msg = Message::tool_result("call_1", "42 bytes");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::assistant_with_tool_calls(
            "",
            vec![MessageToolCall::new("web_search", r#"{"query":"rust"}"#)],
        );
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.tool_calls.len(), 1);
        assert_eq!(deserialized.tool_calls[0].name, "web_search");
    }
}
