//! # pharma-assistant
//!
//! Pharmaceutical assistant built on `agent-core`: answers questions about
//! medicines and dosages, and reaches for tools when the answer depends on
//! the current date or on information newer than the model.
//!
//! ## Tools
//!
//! | Tool | Purpose |
//! |---|---|
//! | `get_current_time` | Brasília wall-clock time |
//! | `tavily_search` | Web search for recent drug information |
//!
//! Search is optional: without a [`SearchClient`] the registry carries only
//! the clock.

pub mod error;
pub mod search;
mod svckit;

pub use error::{AssistantError, Result};
pub use search::{MockSearchClient, SearchClient, SearchHit, TavilyClient, TavilyConfig};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{Clock, CurrentTimeTool, WebSearchTool, DEFAULT_MAX_RESULTS};
}

use std::sync::Arc;

use agent_core::ToolRegistry;

/// System prompt for the pharmaceutical assistant agent
pub const PHARMA_ASSISTANT_PROMPT: &str = r"You are a pharmaceutical assistant specialized in medicines and dosages.

## Available Tools

- `get_current_time`: use it to report the current date and time when the user asks
- `tavily_search`: use it to look up medicines, dosages and drug interactions

## Guidelines

1. Be clear and concise.
2. Use the tools when they are needed; answer directly when they are not.
3. Never invent dosages. If you are unsure, search or say so.
4. Remind the user to confirm treatment decisions with a physician or pharmacist.
5. Reply in the language the user writes in.";

/// Registry with the clock tool and, when a search client is given, web search
pub fn default_registry(search: Option<Arc<dyn SearchClient>>) -> agent_core::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(tools::CurrentTimeTool::new())?;

    if let Some(search) = search {
        registry.register(tools::WebSearchTool::new(search))?;
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::testing::ScriptedClient;
    use agent_core::{AgentConfig, AgentLoop, Arguments, Role, ToolCall, Transcript};
    use agent_core::provider::AgentResponse;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_default_registry_without_search() {
        let registry = default_registry(None).unwrap();
        assert_eq!(registry.names(), vec!["get_current_time"]);
    }

    #[test]
    fn test_default_registry_with_search() {
        let registry = default_registry(Some(Arc::new(MockSearchClient::new()))).unwrap();
        assert_eq!(registry.names(), vec!["get_current_time", "tavily_search"]);
    }

    #[test]
    fn test_prompt_names_every_tool() {
        let registry = default_registry(Some(Arc::new(MockSearchClient::new()))).unwrap();
        for name in registry.names() {
            assert!(PHARMA_ASSISTANT_PROMPT.contains(name));
        }
    }

    #[tokio::test]
    async fn test_time_question_answered_from_clock() {
        let instant = Utc.with_ymd_and_hms(2026, 10, 16, 17, 3, 22).unwrap();
        let mut registry = ToolRegistry::new();
        registry
            .register(tools::CurrentTimeTool::with_clock(Arc::new(move || instant)))
            .unwrap();

        let client = Arc::new(
            ScriptedClient::new()
                .request(vec![ToolCall::new("get_current_time", Arguments::new())])
                .respond_with(|transcript| {
                    let payload = transcript
                        .last()
                        .and_then(|m| m.tool_payload())
                        .unwrap_or_default();
                    let stamp = payload["result"].as_str().unwrap_or_default().to_string();
                    Ok(AgentResponse::FinalAnswer { content: stamp })
                }),
        );
        let config = AgentConfig {
            system_prompt: PHARMA_ASSISTANT_PROMPT.into(),
            ..AgentConfig::default()
        };
        let agent = AgentLoop::new(client.clone(), Arc::new(registry), config);
        let mut transcript = Transcript::new();

        let answer = agent.run_turn("What time is it?", &mut transcript).await.unwrap();

        assert!(answer.contains("16/10/2026 14:03:22"));
        let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::ToolResult, Role::Assistant]
        );
        assert_eq!(client.recorded()[0].tools, vec!["get_current_time".to_string()]);
        assert_eq!(
            transcript.messages()[2].tool_payload(),
            Some(json!({"result": "Current date and time: 16/10/2026 14:03:22 (Brasília time)"}))
        );
    }

    #[tokio::test]
    async fn test_search_results_fed_back() {
        let search = Arc::new(MockSearchClient::with_hits(vec![SearchHit::new(
            "Dipyrone dosing",
            "https://example.org/dipyrone",
            "Adults: 500 mg to 1 g up to 4 times daily",
        )]));
        let registry = default_registry(Some(search.clone())).unwrap();

        let call = ToolCall::new(
            "tavily_search",
            Arguments::from([("query".to_string(), json!("dipyrone adult dose"))]),
        );
        let client = Arc::new(
            ScriptedClient::new()
                .request(vec![call])
                .answer("Adults: 500 mg to 1 g, up to 4 times a day."),
        );
        let agent = AgentLoop::new(client.clone(), Arc::new(registry), AgentConfig::default());
        let mut transcript = Transcript::new();

        agent.run_turn("Dipyrone dose?", &mut transcript).await.unwrap();

        assert_eq!(search.queries(), vec!["dipyrone adult dose".to_string()]);
        let seen = &client.recorded()[1].transcript;
        let payload = seen[2].tool_payload().unwrap();
        assert_eq!(payload["result"]["results"][0]["title"], "Dipyrone dosing");
    }
}
