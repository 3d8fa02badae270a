//! # agent-runtime
//!
//! Reasoning engine adapters for the agent loop.
//!
//! ## Engines
//!
//! - **Gemini** (default for the CLI): Google's hosted models, native function calling
//! - **Ollama**: local inference, tools requested through the text protocol
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::GeminiClient;
//!
//! let client = GeminiClient::from_env()?;
//! let agent = AgentBuilder::new()
//!     .client(Arc::new(client))
//!     .build()?;
//! ```

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "gemini")]
mod http;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiClient, GeminiConfig};
#[cfg(feature = "ollama")]
pub use ollama::{OllamaClient, OllamaConfig};

// Re-export core types for convenience
pub use agent_core::{
    AgentBuilder, AgentError, AgentLoop, Message, ReasoningClient, Result, Role, Tool,
    ToolRegistry, Transcript,
};
