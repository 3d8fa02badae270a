//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// Engine-level errors abort the current turn. Tool-level errors never leave
/// the invoker as `Err`; they are folded into [`crate::tool::ToolResult`] so
/// the reasoning engine can react to them on its next cycle.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Transport or authentication failure reaching the reasoning engine
    #[error("Reasoning engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Engine returned something that is neither a final answer nor a tool request
    #[error("Malformed engine response: {0}")]
    MalformedResponse(String),

    /// Tool not found in registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool name already registered
    #[error("Duplicate tool name: {0}")]
    DuplicateToolName(String),

    /// Tool arguments failed validation
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Turn exceeded the configured number of reasoning cycles
    #[error("Cycle limit ({0}) exceeded")]
    CycleLimitExceeded(usize),

    /// Turn was abandoned by the caller
    #[error("Turn cancelled")]
    Cancelled,

    /// Message violates the transcript invariants
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Errors that abort a whole turn rather than a single tool call
    pub const fn is_turn_failure(&self) -> bool {
        matches!(
            self,
            Self::EngineUnavailable(_)
                | Self::MalformedResponse(_)
                | Self::CycleLimitExceeded(_)
                | Self::Cancelled
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::EngineUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            Self::MalformedResponse(_) => "The AI service returned a response that could not be understood. Please try again.".into(),
            Self::UnknownTool(name) => format!("The tool '{name}' is not available."),
            Self::DuplicateToolName(name) => format!("The tool '{name}' is registered twice."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::CycleLimitExceeded(_) => "The request took too many steps to process. Please try a simpler question.".into(),
            Self::Cancelled => "The request was cancelled.".into(),
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
