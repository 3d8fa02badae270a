//! Mock Search Client
//!
//! For testing and offline demos. Returns canned hits and records queries.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{SearchClient, SearchHit};
use crate::error::{AssistantError, Result};

/// In-memory search client with static results
#[derive(Default)]
pub struct MockSearchClient {
    hits: Vec<SearchHit>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return these hits for every query
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    /// Fail every query with this message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Default::default()
        }
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());

        if let Some(message) = &self.failure {
            return Err(AssistantError::Search(message.clone()));
        }

        Ok(self.hits.iter().take(max_results).cloned().collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
