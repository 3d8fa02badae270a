//! Web Search Tool
//!
//! Looks up current information (drug news, recalls, shortages) through the
//! configured [`SearchClient`].

use std::sync::Arc;

use agent_core::{error::Result as CoreResult, Arguments, ParameterSchema, Tool, ToolDescriptor};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::search::SearchClient;

/// Results returned when the caller does not ask for a number
pub const DEFAULT_MAX_RESULTS: usize = 2;

/// Upper bound on requested results
const MAX_RESULTS_CAP: usize = 10;

/// Tool for searching the web
pub struct WebSearchTool {
    search: Arc<dyn SearchClient>,
}

impl WebSearchTool {
    pub fn new(search: Arc<dyn SearchClient>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "tavily_search",
            "Searches the web for up-to-date information. Returns titles, URLs and \
             content snippets. Use it for recent events, news, or facts you are unsure about.",
        )
        .parameter(ParameterSchema::required("query", "string", "The search query"))
        .parameter(
            ParameterSchema::optional("max_results", "integer", "Maximum number of results")
                .with_default(json!(DEFAULT_MAX_RESULTS)),
        )
    }

    async fn invoke(&self, arguments: &Arguments) -> CoreResult<Value> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim();
        if query.is_empty() {
            return Err(agent_core::AgentError::ToolValidation(
                "query must not be empty".into(),
            ));
        }

        let max_results = arguments
            .get("max_results")
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, MAX_RESULTS_CAP);

        tracing::debug!(provider = self.search.name(), query, max_results, "Web search");
        let hits = self.search.search(query, max_results).await?;

        Ok(json!({
            "query": query,
            "results": hits,
        }))
    }
}
