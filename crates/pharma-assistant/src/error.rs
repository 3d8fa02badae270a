//! Error Types for the Pharmaceutical Assistant

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Search error: {0}")]
    Search(String),

    #[error("Search provider rejected the request ({status}): {body}")]
    SearchStatus { status: u16, body: String },

    #[error("Clock error: {0}")]
    Clock(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<AssistantError> for AgentError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::Config(msg) => Self::Config(msg),
            other => Self::ToolExecution(other.to_string()),
        }
    }
}
