//! Reasoning Client Strategy Pattern
//!
//! Defines a common interface for reasoning engines (Ollama, Gemini, etc.)
//! so the agent loop works with any backend without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{ReasoningClient, AgentResponse};
//!
//! let response = client
//!     .infer(&instructions, &transcript.snapshot(), registry.descriptors(), &options)
//!     .await?;
//!
//! match response {
//!     AgentResponse::FinalAnswer { content } => println!("{content}"),
//!     AgentResponse::ToolRequest { calls } => { /* dispatch */ }
//! }
//! ```

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::tool::{generate_call_id, ToolCall, ToolDescriptor};

/// Configuration for engine generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gemini-2.5-flash", "llama3.2")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

const fn default_temperature() -> f32 { 0.7 }
const fn default_max_tokens() -> u32 { 2048 }
const fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

/// A classified engine response
///
/// Never both, never neither: adapters build it through
/// [`AgentResponse::classify`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentResponse {
    /// Turn is done; `content` is the answer
    FinalAnswer { content: String },

    /// Engine wants these tools run, in order
    ToolRequest { calls: Vec<ToolCall> },
}

impl AgentResponse {
    /// Classify raw engine output
    ///
    /// Tool calls win over accompanying text, which is dropped. Empty text
    /// with no calls is malformed. Call ids that are blank or repeat an
    /// earlier id in the same response are regenerated.
    pub fn classify(content: impl Into<String>, mut calls: Vec<ToolCall>) -> Result<Self> {
        let content = content.into();

        if !calls.is_empty() {
            let mut seen = HashSet::with_capacity(calls.len());
            for call in &mut calls {
                if call.id.trim().is_empty() || !seen.insert(call.id.clone()) {
                    let fresh = generate_call_id();
                    tracing::debug!(tool = %call.name, old_id = %call.id, new_id = %fresh, "Replacing unusable call id");
                    call.id = fresh;
                    seen.insert(call.id.clone());
                }
            }

            if !content.trim().is_empty() {
                tracing::debug!(text = %content.trim(), "Dropping text that accompanied tool calls");
            }
            if let Some(call) = calls.iter().find(|c| c.name.trim().is_empty()) {
                return Err(AgentError::MalformedResponse(format!(
                    "tool call {} has no tool name",
                    call.id
                )));
            }
            return Ok(Self::ToolRequest { calls });
        }

        if content.trim().is_empty() {
            return Err(AgentError::MalformedResponse(
                "response has neither text nor tool calls".into(),
            ));
        }

        Ok(Self::FinalAnswer { content })
    }

    /// Re-check a response produced outside [`AgentResponse::classify`]
    ///
    /// Empty tool requests and blank answers become `MalformedResponse`.
    pub fn validated(self) -> Result<Self> {
        match self {
            Self::FinalAnswer { content } => Self::classify(content, Vec::new()),
            Self::ToolRequest { calls } => Self::classify(String::new(), calls),
        }
    }

    /// Assistant transcript entry for this response
    pub fn to_message(&self) -> Message {
        match self {
            Self::FinalAnswer { content } => Message::assistant(content.clone()),
            Self::ToolRequest { calls } => Message::assistant_tool_calls(calls.clone()),
        }
    }
}

/// Strategy trait for reasoning engines
///
/// Implementations must not mutate the transcript; the caller appends the
/// returned response.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Check if the engine is reachable and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Run one reasoning step over the transcript
    ///
    /// Fails with [`AgentError::EngineUnavailable`] on transport/auth
    /// failure and [`AgentError::MalformedResponse`] when the output cannot
    /// be classified.
    async fn infer(
        &self,
        system_instructions: &str,
        transcript: &[Message],
        tools: &[ToolDescriptor],
        options: &GenerationOptions,
    ) -> Result<AgentResponse>;
}
