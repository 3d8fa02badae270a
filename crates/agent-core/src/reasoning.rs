//! Agent Loop
//!
//! Drives one user turn through alternating reasoning and tool steps:
//!
//! ```text
//!  user input ──► REASONING ──FinalAnswer──► done
//!                   ▲   │
//!                   │   └─ToolRequest─► EXECUTING_TOOLS
//!                   └──────────────────────────┘
//! ```
//!
//! The transcript is never rolled back: a failed turn leaves everything
//! appended before the failure in place for the next turn.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::invoker::{InvokerConfig, ToolInvoker};
use crate::message::{Message, Transcript};
use crate::provider::{AgentResponse, GenerationOptions, ReasoningClient};
use crate::tool::{Tool, ToolCall, ToolRegistry};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System instructions sent with every reasoning step
    pub system_prompt: String,

    /// Maximum reasoning steps per turn
    pub max_cycles: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Timeout for one reasoning step (`None` waits forever)
    pub infer_timeout: Option<Duration>,

    /// Tool dispatch settings
    pub invoker: InvokerConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_cycles: 10,
            generation: GenerationOptions::default(),
            infer_timeout: Some(Duration::from_secs(120)),
            invoker: InvokerConfig::default(),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.
Use the available tools when they help answer the question.
After receiving tool results, synthesize them into a helpful response.
If you can answer directly without tools, do so.
Be concise and accurate.";

enum LoopState {
    Reasoning,
    ExecutingTools(Vec<ToolCall>),
}

/// The orchestrator
pub struct AgentLoop {
    client: Arc<dyn ReasoningClient>,
    tools: Arc<ToolRegistry>,
    invoker: ToolInvoker,
    config: AgentConfig,
}

impl AgentLoop {
    /// Create a new agent loop
    pub fn new(
        client: Arc<dyn ReasoningClient>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            client,
            tools,
            invoker: ToolInvoker::new(config.invoker.clone()),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(client: Arc<dyn ReasoningClient>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(client, tools, AgentConfig::default())
    }

    /// Run one turn; returns the final answer
    pub async fn run_turn(&self, user_input: &str, transcript: &mut Transcript) -> Result<String> {
        self.run_turn_with_cancel(user_input, transcript, &CancellationToken::new())
            .await
    }

    /// Run one turn, abandoning it when `cancel` fires
    pub async fn run_turn_with_cancel(
        &self,
        user_input: &str,
        transcript: &mut Transcript,
        cancel: &CancellationToken,
    ) -> Result<String> {
        transcript.append(Message::user(user_input))?;

        let start = Instant::now();
        let mut state = LoopState::Reasoning;
        let mut cycles = 0;

        loop {
            state = match state {
                LoopState::Reasoning => {
                    if cycles >= self.config.max_cycles {
                        tracing::warn!(cycles, "Turn hit the cycle limit");
                        return Err(AgentError::CycleLimitExceeded(self.config.max_cycles));
                    }
                    cycles += 1;

                    tracing::debug!(
                        cycle = cycles,
                        messages = transcript.len(),
                        est_tokens = transcript.estimate_tokens(),
                        "Reasoning"
                    );

                    let response = match self
                        .infer(transcript, cancel)
                        .await
                        .and_then(AgentResponse::validated)
                    {
                        Ok(response) => response,
                        Err(e) => {
                            tracing::warn!(cycle = cycles, error = %e, "Reasoning step failed");
                            return Err(e);
                        }
                    };

                    transcript.append(response.to_message())?;
                    match response {
                        AgentResponse::FinalAnswer { content } => {
                            tracing::info!(
                                cycles,
                                elapsed_ms = start.elapsed().as_millis(),
                                "Turn complete"
                            );
                            return Ok(content);
                        }
                        AgentResponse::ToolRequest { calls } => {
                            tracing::debug!(cycle = cycles, calls = calls.len(), "Engine requested tools");
                            LoopState::ExecutingTools(calls)
                        }
                    }
                }
                LoopState::ExecutingTools(calls) => {
                    let results = self.invoker.dispatch(&calls, &self.tools, cancel).await;

                    // Every call gets its result entry, even on cancellation,
                    // so the next turn never sees an unanswered request.
                    for result in &results {
                        transcript.append(Message::tool_result(result))?;
                    }

                    if cancel.is_cancelled() {
                        return Err(AgentError::Cancelled);
                    }
                    LoopState::Reasoning
                }
            };
        }
    }

    async fn infer(&self, transcript: &Transcript, cancel: &CancellationToken) -> Result<AgentResponse> {
        let snapshot = transcript.snapshot();
        let call = self.client.infer(
            &self.config.system_prompt,
            &snapshot,
            self.tools.descriptors(),
            &self.config.generation,
        );

        let timed = async {
            match self.config.infer_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(response) => response,
                    Err(_) => Err(AgentError::EngineUnavailable(format!(
                        "{} did not respond within {} seconds",
                        self.client.name(),
                        limit.as_secs()
                    ))),
                },
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AgentError::Cancelled),
            response = timed => response,
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for AgentLoop configuration
pub struct AgentBuilder {
    client: Option<Arc<dyn ReasoningClient>>,
    tools: ToolRegistry,
    pending: Vec<Arc<dyn Tool>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            tools: ToolRegistry::new(),
            pending: Vec::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn client(mut self, client: Arc<dyn ReasoningClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Add a tool; name clashes surface from [`AgentBuilder::build`]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.pending.push(Arc::new(tool));
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub const fn max_cycles(mut self, max: usize) -> Self {
        self.config.max_cycles = max;
        self
    }

    pub const fn infer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.infer_timeout = timeout;
        self
    }

    pub const fn tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.invoker.timeout = timeout;
        self
    }

    pub const fn parallel_tools(mut self, parallel: bool) -> Self {
        self.config.invoker.parallel = parallel;
        self
    }

    pub fn build(mut self) -> Result<AgentLoop> {
        let client = self
            .client
            .ok_or_else(|| AgentError::Config("Reasoning client is required".into()))?;

        if self.config.max_cycles == 0 {
            return Err(AgentError::Config("max_cycles must be at least 1".into()));
        }

        for tool in self.pending {
            self.tools.register_arc(tool)?;
        }

        Ok(AgentLoop::new(client, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::testing::ScriptedClient;
    use crate::tool::{Arguments, ToolDescriptor, ToolFailureKind};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct ClockTool;

    #[async_trait]
    impl Tool for ClockTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("get_current_time", "Current date and time")
        }

        async fn invoke(&self, _arguments: &Arguments) -> Result<Value> {
            Ok(json!("16/10/2026 14:03:22"))
        }
    }

    struct SearchTool;

    #[async_trait]
    impl Tool for SearchTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("tavily_search", "Web search")
        }

        async fn invoke(&self, _arguments: &Arguments) -> Result<Value> {
            Ok(json!({"results": []}))
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new(name, Arguments::new())
    }

    fn agent(client: &Arc<ScriptedClient>) -> AgentLoop {
        AgentBuilder::new()
            .client(client.clone())
            .tool(ClockTool)
            .tool(SearchTool)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_turn_without_tools() {
        let client = Arc::new(ScriptedClient::new().answer("Hello!"));
        let agent = agent(&client);
        let mut transcript = Transcript::new();

        let answer = agent.run_turn("Hi", &mut transcript).await.unwrap();

        assert_eq!(answer, "Hello!");
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].role, Role::User);
        assert_eq!(transcript.messages()[1].content, "Hello!");
    }

    #[tokio::test]
    async fn test_transcript_growth_with_tool_cycles() {
        let client = Arc::new(
            ScriptedClient::new()
                .request(vec![call("get_current_time"), call("tavily_search")])
                .request(vec![call("tavily_search")])
                .answer("Done"),
        );
        let agent = agent(&client);
        let mut transcript = Transcript::new();
        transcript.append(Message::user("earlier")).unwrap();
        transcript.append(Message::assistant("earlier answer")).unwrap();
        let before = transcript.len();

        agent.run_turn("Look it up", &mut transcript).await.unwrap();

        // user + (1 + 2) + (1 + 1) + final
        assert_eq!(transcript.len(), before + 1 + 3 + 2 + 1);
        assert_eq!(client.infer_count(), 3);
    }

    #[tokio::test]
    async fn test_tool_results_follow_request_order() {
        let first = call("tavily_search");
        let second = call("get_current_time");
        let client = Arc::new(
            ScriptedClient::new()
                .request(vec![first.clone(), second.clone()])
                .answer("ok"),
        );
        let mut transcript = Transcript::new();

        agent(&client).run_turn("q", &mut transcript).await.unwrap();

        let refs: Vec<_> = transcript
            .messages()
            .iter()
            .filter(|m| m.role == Role::ToolResult)
            .map(|m| m.tool_result_ref.clone().unwrap())
            .collect();
        assert_eq!(refs, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_final_answer_halts() {
        let client = Arc::new(
            ScriptedClient::new()
                .answer("first")
                .request(vec![call("get_current_time")])
                .answer("never"),
        );
        let mut transcript = Transcript::new();

        let answer = agent(&client).run_turn("q", &mut transcript).await.unwrap();

        assert_eq!(answer, "first");
        assert_eq!(client.infer_count(), 1);
        assert_eq!(client.remaining(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fed_back() {
        let client = Arc::new(
            ScriptedClient::new()
                .request(vec![call("weather")])
                .answer("Sorry, I could not look that up."),
        );
        let mut transcript = Transcript::new();

        let answer = agent(&client).run_turn("Weather?", &mut transcript).await.unwrap();

        assert_eq!(answer, "Sorry, I could not look that up.");
        let tool_msg = &transcript.messages()[2];
        assert_eq!(tool_msg.role, Role::ToolResult);
        let payload = tool_msg.tool_payload().unwrap();
        assert_eq!(payload["error"]["kind"], json!(ToolFailureKind::UnknownTool));

        // The engine saw the failure on its second cycle
        let second = &client.recorded()[1];
        assert_eq!(second.transcript.len(), 3);
        assert_eq!(second.transcript[2].role, Role::ToolResult);
    }

    #[tokio::test]
    async fn test_engine_failure_keeps_user_message_only() {
        let client = Arc::new(
            ScriptedClient::new().fail(AgentError::EngineUnavailable("connection refused".into())),
        );
        let mut transcript = Transcript::new();

        let err = agent(&client).run_turn("Hi", &mut transcript).await.unwrap_err();

        assert!(matches!(err, AgentError::EngineUnavailable(_)));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_failure_mid_turn_is_not_rolled_back() {
        let client = Arc::new(
            ScriptedClient::new()
                .request(vec![call("get_current_time")])
                .fail(AgentError::MalformedResponse("garbage".into())),
        );
        let mut transcript = Transcript::new();

        assert!(agent(&client).run_turn("q", &mut transcript).await.is_err());
        // user, assistant-with-calls, tool result
        assert_eq!(transcript.len(), 3);
    }

    #[tokio::test]
    async fn test_cycle_limit() {
        let mut script = ScriptedClient::new();
        for _ in 0..5 {
            script = script.request(vec![call("get_current_time")]);
        }
        let client = Arc::new(script);
        let agent = AgentBuilder::new()
            .client(client.clone())
            .tool(ClockTool)
            .max_cycles(3)
            .build()
            .unwrap();
        let mut transcript = Transcript::new();

        let err = agent.run_turn("loop", &mut transcript).await.unwrap_err();

        assert!(matches!(err, AgentError::CycleLimitExceeded(3)));
        assert_eq!(client.infer_count(), 3);
    }

    #[tokio::test]
    async fn test_snapshots_are_isolated() {
        let client = Arc::new(
            ScriptedClient::new()
                .request(vec![call("get_current_time")])
                .answer("ok"),
        );
        let mut transcript = Transcript::new();

        agent(&client).run_turn("q", &mut transcript).await.unwrap();

        let recorded = client.recorded();
        assert_eq!(recorded[0].transcript.len(), 1);
        assert_eq!(recorded[1].transcript.len(), 3);
        assert_eq!(recorded[0].tools, vec!["get_current_time", "tavily_search"]);
    }

    #[tokio::test]
    async fn test_history_carries_across_turns() {
        let client = Arc::new(ScriptedClient::new().answer("one").answer("two"));
        let agent = agent(&client);
        let mut transcript = Transcript::new();

        agent.run_turn("first", &mut transcript).await.unwrap();
        agent.run_turn("second", &mut transcript).await.unwrap();

        assert_eq!(transcript.len(), 4);
        assert_eq!(client.recorded()[1].transcript.len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_turn() {
        let client = Arc::new(ScriptedClient::new().answer("late"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut transcript = Transcript::new();

        let err = agent(&client)
            .run_turn_with_cancel("q", &mut transcript, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_responses_are_malformed() {
        for client in [
            ScriptedClient::new().request(vec![]),
            ScriptedClient::new().answer(""),
        ] {
            let client = Arc::new(client);
            let mut transcript = Transcript::new();

            let err = agent(&client).run_turn("q", &mut transcript).await.unwrap_err();

            assert!(matches!(err, AgentError::MalformedResponse(_)));
            assert!(err.is_turn_failure());
            assert_eq!(transcript.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_repeated_call_ids_keep_results_apart() {
        let client = Arc::new(
            ScriptedClient::new()
                .request(vec![
                    call("get_current_time").with_id("x"),
                    call("tavily_search").with_id("x"),
                ])
                .answer("done"),
        );
        let mut transcript = Transcript::new();

        agent(&client).run_turn("q", &mut transcript).await.unwrap();

        let messages = transcript.messages();
        let ids: Vec<&str> = messages[1].tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_ne!(ids[0], ids[1]);
        assert_eq!(messages[2].tool_result_ref.as_deref(), Some(ids[0]));
        assert_eq!(messages[3].tool_result_ref.as_deref(), Some(ids[1]));

        let names = crate::message::tool_names_by_call_id(messages);
        assert_eq!(names.get(ids[0]).copied(), Some("get_current_time"));
        assert_eq!(names.get(ids[1]).copied(), Some("tavily_search"));
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("slow_lookup", "Takes an hour")
        }

        async fn invoke(&self, _arguments: &Arguments) -> Result<Value> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!("finished"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_tools_run() {
        let client = Arc::new(
            ScriptedClient::new()
                .request(vec![call("get_current_time"), call("slow_lookup")])
                .answer("unused"),
        );
        let agent = AgentBuilder::new()
            .client(client.clone())
            .tool(ClockTool)
            .tool(SlowTool)
            .tool_timeout(None)
            .build()
            .unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let mut transcript = Transcript::new();

        let err = agent
            .run_turn_with_cancel("q", &mut transcript, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Cancelled));
        assert_eq!(transcript.len(), 4);
        assert_eq!(client.infer_count(), 1);

        let kinds: Vec<Option<ToolFailureKind>> = transcript.messages()[2..]
            .iter()
            .map(|m| {
                m.tool_payload()
                    .and_then(|p| p.get("error").cloned())
                    .and_then(|e| serde_json::from_value(e["kind"].clone()).ok())
            })
            .collect();
        assert_eq!(kinds, vec![None, Some(ToolFailureKind::Cancelled)]);
    }

    struct StalledClient;

    #[async_trait]
    impl ReasoningClient for StalledClient {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn infer(
            &self,
            _system_instructions: &str,
            _transcript: &[Message],
            _tools: &[ToolDescriptor],
            _options: &GenerationOptions,
        ) -> Result<AgentResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(AgentResponse::FinalAnswer { content: "too late".into() })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_infer_timeout() {
        let agent = AgentBuilder::new()
            .client(Arc::new(StalledClient))
            .infer_timeout(Some(Duration::from_secs(5)))
            .build()
            .unwrap();
        let mut transcript = Transcript::new();

        let err = agent.run_turn("q", &mut transcript).await.unwrap_err();

        assert!(matches!(err, AgentError::EngineUnavailable(msg) if msg.contains("stalled")));
    }

    #[test]
    fn test_builder_rejects_duplicate_tools() {
        let result = AgentBuilder::new()
            .client(Arc::new(ScriptedClient::new()))
            .tool(ClockTool)
            .tool(ClockTool)
            .build();
        assert!(matches!(result, Err(AgentError::DuplicateToolName(_))));
    }

    #[test]
    fn test_builder_requires_client() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }
}
