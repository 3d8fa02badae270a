//! Tavily Search Client
//!
//! Calls the Tavily search API (`POST /search`). Requires `TAVILY_API_KEY`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SearchClient, SearchHit};
use crate::error::{AssistantError, Result};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 300;

/// Tavily client configuration
#[derive(Clone, Debug)]
pub struct TavilyConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl TavilyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 15,
        }
    }

    /// Read `TAVILY_API_KEY`; a missing or blank key is a configuration error
    pub fn from_env() -> Result<Self> {
        match std::env::var("TAVILY_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key)),
            _ => Err(AssistantError::Config(
                "TAVILY_API_KEY is not set; web search is unavailable".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResult> for SearchHit {
    fn from(r: TavilyResult) -> Self {
        Self::new(r.title, r.url, r.content)
    }
}

/// Tavily-backed search client
pub struct TavilyClient {
    client: reqwest::Client,
    config: TavilyConfig,
}

impl TavilyClient {
    pub fn new(config: TavilyConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AssistantError::Config("Tavily API key is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(TavilyConfig::from_env()?)
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let request = SearchRequest {
            query,
            max_results,
            search_depth: "basic",
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::SearchStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body: SearchResponse = response.json().await?;
        tracing::debug!(query, hits = body.results.len(), "Tavily search");

        Ok(body
            .results
            .into_iter()
            .take(max_results)
            .map(SearchHit::from)
            .collect())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}
