//! Web Search Integration
//!
//! Abstractions and implementations for web search providers.

mod mock;
mod tavily;

pub use mock::MockSearchClient;
pub use tavily::{TavilyClient, TavilyConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    /// Extracted page snippet
    pub content: String,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }
}

/// Search client trait (Strategy pattern)
///
/// Implement this for each provider: Tavily, a mock for tests, etc.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run a query and return at most `max_results` hits
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;

    /// Provider name
    fn name(&self) -> &str;
}
