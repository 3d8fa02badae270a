//! Ollama Reasoning Client
//!
//! Implementation of `ReasoningClient` for local Ollama inference. Tools are
//! described in the system prompt and requested with the text protocol from
//! [`agent_core::protocol`].

use agent_core::{
    error::{AgentError, Result},
    message::{tool_names_by_call_id, Message, Role},
    protocol,
    provider::{AgentResponse, GenerationOptions, ReasoningClient},
    tool::ToolDescriptor,
};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage, MessageRole},
    models::ModelOptions,
    Ollama,
};

/// Ollama client configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST")
            .unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);

        Self { host, port }
    }
}

/// Ollama reasoning client
pub struct OllamaClient {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new Ollama client with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
        })
    }

    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.clone(), config.port),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::from_config(OllamaConfig::default())
    }

    pub const fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Names of locally installed models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::EngineUnavailable(format!("Ollama: {e}")))?;

        Ok(models.into_iter().map(|m| m.name).collect())
    }

    /// Convert the transcript to Ollama chat messages
    fn convert_messages(
        system_instructions: &str,
        transcript: &[Message],
        tools: &[ToolDescriptor],
    ) -> Vec<ChatMessage> {
        let mut system = system_instructions.to_string();
        if !tools.is_empty() {
            system.push_str("\n\n");
            system.push_str(&protocol::render_tool_section(tools));
        }

        let names = tool_names_by_call_id(transcript);
        let mut messages = vec![ChatMessage::new(MessageRole::System, system)];

        messages.extend(transcript.iter().map(|m| match m.role {
            Role::System => ChatMessage::new(MessageRole::System, m.content.clone()),
            Role::User => ChatMessage::new(MessageRole::User, m.content.clone()),
            Role::Assistant if m.has_tool_calls() => ChatMessage::new(
                MessageRole::Assistant,
                protocol::render_tool_calls(&m.tool_calls),
            ),
            Role::Assistant => ChatMessage::new(MessageRole::Assistant, m.content.clone()),
            // Tool results appear as user context
            Role::ToolResult => {
                let name = m
                    .tool_result_ref
                    .as_deref()
                    .and_then(|id| names.get(id).copied())
                    .unwrap_or("unknown");
                ChatMessage::new(MessageRole::User, format_tool_result(name, m))
            }
        }));

        messages
    }

    /// Build Ollama model options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        ModelOptions::default()
            .temperature(opts.temperature)
            .top_p(opts.top_p)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX))
    }
}

/// Render a tool result entry for the model
fn format_tool_result(name: &str, message: &Message) -> String {
    let Some(payload) = message.tool_payload() else {
        return format!("[Tool '{name}' returned]\n{}", message.content);
    };

    if let Some(error) = payload.get("error") {
        let detail = error
            .get("message")
            .and_then(|v| v.as_str())
            .map_or_else(|| error.to_string(), str::to_string);
        return format!("[Tool '{name}' failed]\n{detail}");
    }

    let output = match payload.get("result") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(value) => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        None => payload.to_string(),
    };
    format!("[Tool '{name}' returned]\n{output}")
}

#[async_trait]
impl ReasoningClient for OllamaClient {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn infer(
        &self,
        system_instructions: &str,
        transcript: &[Message],
        tools: &[ToolDescriptor],
        options: &GenerationOptions,
    ) -> Result<AgentResponse> {
        let request = ChatMessageRequest::new(
            options.model.clone(),
            Self::convert_messages(system_instructions, transcript, tools),
        )
        .options(Self::build_options(options));

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::EngineUnavailable(format!("Ollama: {e}")))?;

        tracing::debug!(
            model = %options.model,
            chars = response.message.content.len(),
            "Ollama completion"
        );

        protocol::parse_response(&response.message.content)
    }
}
