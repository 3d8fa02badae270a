//! Shared HTTP plumbing for the engine adapters.

use std::time::Duration;

use agent_core::{AgentError, Result};
use serde::de::DeserializeOwned;

/// Longest error body echoed into an error message
const MAX_ERROR_BODY: usize = 300;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))
}

/// Send a request and decode a JSON body
///
/// Transport failures and non-2xx statuses are `EngineUnavailable`; an
/// undecodable body is `MalformedResponse`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    engine: &str,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AgentError::EngineUnavailable(format!("{engine} request failed: {e}")))?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        AgentError::EngineUnavailable(format!("{engine} response could not be read: {e}"))
    })?;

    if !status.is_success() {
        let snippet: String = body.chars().take(MAX_ERROR_BODY).collect();
        tracing::warn!(engine, status = status.as_u16(), "Engine returned an error status");
        let reason = match status.as_u16() {
            401 | 403 => "authentication failed",
            429 => "rate limited",
            _ => "request rejected",
        };
        return Err(AgentError::EngineUnavailable(format!(
            "{engine} {reason} ({status}): {snippet}"
        )));
    }

    serde_json::from_str(&body).map_err(|e| {
        AgentError::MalformedResponse(format!("{engine} returned an unexpected body: {e}"))
    })
}
