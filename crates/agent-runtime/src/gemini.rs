//! Gemini Reasoning Client
//!
//! Implementation of `ReasoningClient` for Google's Gemini models over the
//! `generateContent` REST endpoint, using native function calling.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{tool_names_by_call_id, Message, Role},
    provider::{AgentResponse, GenerationOptions, ReasoningClient},
    tool::{generate_call_id, Arguments, ToolCall, ToolDescriptor},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::http;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini client configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,

    /// REST base URL
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
        }
    }

    /// Read `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) and `GEMINI_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .map_err(|_| AgentError::Config("GEMINI_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSet>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolSet {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

// ============================================================================
// Client
// ============================================================================

/// Gemini reasoning client
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create from configuration
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(Duration::from_secs(config.timeout_secs))?,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(GeminiConfig::from_env()?)
    }

    fn build_request(
        system_instructions: &str,
        transcript: &[Message],
        tools: &[ToolDescriptor],
        options: &GenerationOptions,
    ) -> GenerateRequest {
        // Transcript-level system entries are folded into the instruction
        let mut system = system_instructions.to_string();
        for m in transcript.iter().filter(|m| m.role == Role::System) {
            system.push_str("\n\n");
            system.push_str(&m.content);
        }

        GenerateRequest {
            system_instruction: (!system.trim().is_empty()).then(|| Content {
                role: None,
                parts: vec![Part::text(system)],
            }),
            contents: convert_contents(transcript),
            tools: if tools.is_empty() {
                Vec::new()
            } else {
                vec![ToolSet {
                    function_declarations: tools.iter().map(declaration).collect(),
                }]
            },
            generation_config: GenerationConfig {
                temperature: options.temperature,
                top_p: options.top_p,
                max_output_tokens: options.max_tokens,
            },
        }
    }
}

/// Map transcript entries to Gemini contents
///
/// Consecutive tool results become one `user` turn with several
/// `functionResponse` parts, matching the preceding `functionCall` turn.
fn convert_contents(transcript: &[Message]) -> Vec<Content> {
    let names = tool_names_by_call_id(transcript);
    let mut contents: Vec<Content> = Vec::new();

    for m in transcript {
        let (role, part_list) = match m.role {
            Role::System => continue,
            Role::User => ("user", vec![Part::text(m.content.clone())]),
            Role::Assistant if m.has_tool_calls() => (
                "model",
                m.tool_calls
                    .iter()
                    .map(|call| Part {
                        function_call: Some(FunctionCall {
                            name: call.name.clone(),
                            args: json!(call.arguments),
                        }),
                        ..Default::default()
                    })
                    .collect(),
            ),
            Role::Assistant => ("model", vec![Part::text(m.content.clone())]),
            Role::ToolResult => {
                let name = m
                    .tool_result_ref
                    .as_deref()
                    .and_then(|id| names.get(id).copied())
                    .unwrap_or("unknown");
                let response = match m.tool_payload() {
                    Some(payload @ Value::Object(_)) => payload,
                    _ => json!({ "result": m.content }),
                };
                let part = Part {
                    function_response: Some(FunctionResponse {
                        name: name.to_string(),
                        response,
                    }),
                    ..Default::default()
                };

                if let Some(last) = contents.last_mut()
                    && last.role.as_deref() == Some("user")
                    && last.parts.iter().all(|p| p.function_response.is_some())
                {
                    last.parts.push(part);
                    continue;
                }
                ("user", vec![part])
            }
        };

        contents.push(Content {
            role: Some(role.to_string()),
            parts: part_list,
        });
    }

    contents
}

/// Function declaration for one tool
fn declaration(tool: &ToolDescriptor) -> FunctionDeclaration {
    let parameters = (!tool.parameters.is_empty()).then(|| {
        let mut schema = tool.input_schema();
        // Gemini's schema subset has no `default`
        if let Some(props) = schema.get_mut("properties").and_then(Value::as_object_mut) {
            for prop in props.values_mut() {
                if let Some(obj) = prop.as_object_mut() {
                    obj.remove("default");
                }
            }
        }
        schema
    });

    FunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters,
    }
}

/// Classify the first candidate into an agent response
fn classify(response: GenerateResponse) -> Result<AgentResponse> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".into());
        return Err(AgentError::MalformedResponse(format!(
            "Gemini returned no answer: {reason}"
        )));
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    let mut text = String::new();
    let mut calls = Vec::new();

    for part in parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(fc) = part.function_call {
            let arguments: Arguments = match fc.args {
                Value::Null => Arguments::new(),
                args => serde_json::from_value(args).map_err(|e| {
                    AgentError::MalformedResponse(format!(
                        "arguments for '{}' are not an object: {e}",
                        fc.name
                    ))
                })?,
            };
            calls.push(ToolCall {
                id: generate_call_id(),
                name: fc.name,
                arguments,
            });
        }
    }

    if calls.is_empty() && text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        return Err(AgentError::MalformedResponse(format!(
            "Gemini candidate has no text or function calls (finish reason: {reason})"
        )));
    }

    AgentResponse::classify(text, calls)
}

#[async_trait]
impl ReasoningClient for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.config.base_url);
        let result: Result<Value> = http::send_json(
            self.client.get(url).header("x-goog-api-key", &self.config.api_key),
            "Gemini",
        )
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
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
        let request = Self::build_request(system_instructions, transcript, tools, options);
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, options.model
        );

        let response: GenerateResponse = http::send_json(
            self.client
                .post(url)
                .header("x-goog-api-key", &self.config.api_key)
                .json(&request),
            "Gemini",
        )
        .await?;

        if let Some(usage) = &response.usage_metadata {
            tracing::debug!(
                model = %options.model,
                prompt_tokens = usage.prompt_token_count,
                completion_tokens = usage.candidates_token_count,
                "Gemini completion"
            );
        }

        classify(response)
    }
}
