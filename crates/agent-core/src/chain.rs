//! Single-Shot Chain
//!
//! The non-agentic variant: system prompt + history + new input, one
//! reasoning step with no tools offered. History is only updated when the
//! call succeeds.

use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::{Message, Transcript};
use crate::provider::{AgentResponse, ReasoningClient};
use crate::reasoning::AgentConfig;

/// Prompt → engine chain with conversation memory
pub struct ChatChain {
    client: Arc<dyn ReasoningClient>,
    config: AgentConfig,
}

impl ChatChain {
    pub fn new(client: Arc<dyn ReasoningClient>, config: AgentConfig) -> Self {
        Self { client, config }
    }

    /// Answer one input; appends the user/assistant pair only on success
    pub async fn ask(&self, user_input: &str, transcript: &mut Transcript) -> Result<String> {
        let user = Message::user(user_input);
        user.validate()?;

        let mut messages = transcript.snapshot();
        messages.push(user.clone());

        let call = self.client.infer(
            &self.config.system_prompt,
            &messages,
            &[],
            &self.config.generation,
        );
        let response = match self.config.infer_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(response) => response,
                Err(_) => Err(AgentError::EngineUnavailable(format!(
                    "{} did not respond within {} seconds",
                    self.client.name(),
                    limit.as_secs()
                ))),
            },
            None => call.await,
        };

        match response.and_then(AgentResponse::validated)? {
            AgentResponse::FinalAnswer { content } => {
                transcript.append(user)?;
                transcript.append(Message::assistant(content.clone()))?;
                Ok(content)
            }
            AgentResponse::ToolRequest { calls } => Err(AgentError::MalformedResponse(format!(
                "engine requested {} tool call(s) but no tools were offered",
                calls.len()
            ))),
        }
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}
