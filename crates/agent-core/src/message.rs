//! Conversation Messages
//!
//! Transcript entries and the append-only [`Transcript`] threaded through
//! every turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AgentError, Result};
use crate::tool::{ToolCall, ToolResult};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (engine) response
    Assistant,
    /// Outcome of one tool call
    ToolResult,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::ToolResult => write!(f, "tool_result"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content (empty when the entry is purely a tool request)
    #[serde(default)]
    pub content: String,

    /// Requested tool calls (assistant entries only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Id of the call this entry answers (tool_result entries only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result_ref: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_result_ref: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant final-answer message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message that requests tools
    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, String::new());
        msg.tool_calls = calls;
        msg
    }

    /// Create a tool result message from an invocation outcome
    pub fn tool_result(result: &ToolResult) -> Self {
        let mut msg = Self::new(Role::ToolResult, result.payload().to_string());
        msg.tool_result_ref = Some(result.call_id.clone());
        msg
    }

    /// Whether this entry carries tool requests
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Parsed JSON payload of a tool result entry
    pub fn tool_payload(&self) -> Option<serde_json::Value> {
        if self.role != Role::ToolResult {
            return None;
        }
        serde_json::from_str(&self.content).ok()
    }

    /// Check the role/content invariants
    pub fn validate(&self) -> Result<()> {
        match self.role {
            Role::Assistant => {
                let has_content = !self.content.trim().is_empty();
                match (has_content, self.has_tool_calls()) {
                    (true, true) => Err(AgentError::InvalidMessage(
                        "assistant message carries both content and tool calls".into(),
                    )),
                    (false, false) => Err(AgentError::InvalidMessage(
                        "assistant message carries neither content nor tool calls".into(),
                    )),
                    _ => Ok(()),
                }
            }
            Role::ToolResult if self.tool_result_ref.is_none() => Err(AgentError::InvalidMessage(
                "tool result message has no call reference".into(),
            )),
            _ if self.has_tool_calls() => Err(AgentError::InvalidMessage(format!(
                "{} message cannot carry tool calls",
                self.role
            ))),
            _ => Ok(()),
        }
    }

    /// Estimate token count (rough approximation)
    pub fn estimate_tokens(&self) -> u32 {
        let calls: usize = self
            .tool_calls
            .iter()
            .map(|c| c.name.len() + serde_json::to_string(&c.arguments).map_or(0, |s| s.len()))
            .sum();
        // ~4 characters per token, +4 for role overhead
        u32::try_from((self.content.len() + calls) / 4).unwrap_or(u32::MAX).saturating_add(4)
    }
}

/// Map each requested call id to its tool name
///
/// Lets adapters label `tool_result` entries, which only carry the call id.
pub fn tool_names_by_call_id(messages: &[Message]) -> HashMap<&str, &str> {
    messages
        .iter()
        .flat_map(|m| m.tool_calls.iter())
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect()
}

/// Ordered, append-only conversation history
///
/// Owned by one in-flight turn at a time. Nothing here removes or reorders
/// entries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message
    pub fn append(&mut self, message: Message) -> Result<()> {
        message.validate()?;
        self.messages.push(message);
        Ok(())
    }

    /// Owned copy of the history; later appends are not visible through it
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Borrowed view of all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Estimate total tokens in the transcript
    pub fn estimate_tokens(&self) -> u32 {
        self.messages.iter().map(Message::estimate_tokens).sum()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
