//! # agent-core
//!
//! Agent/tool orchestration with a provider-agnostic reasoning client.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        AgentLoop                            │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Transcript  │  │ ToolInvoker │  │  ReasoningClient    │  │
//! │  │ (per turn)  │──│ + Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ReasoningClient` trait enables swapping between Gemini, Ollama, or
//! any other engine without changing the loop.

pub mod chain;
pub mod error;
pub mod invoker;
pub mod message;
pub mod protocol;
pub mod provider;
pub mod reasoning;
pub mod testing;
pub mod tool;

pub use chain::ChatChain;
pub use error::{AgentError, Result};
pub use invoker::{InvokerConfig, ToolInvoker};
pub use message::{Message, Role, Transcript};
pub use provider::{AgentResponse, GenerationOptions, ReasoningClient};
pub use reasoning::{AgentBuilder, AgentConfig, AgentLoop};
pub use tool::{
    Arguments, ParameterSchema, Tool, ToolCall, ToolDescriptor, ToolFailure, ToolFailureKind,
    ToolRegistry, ToolResult,
};
