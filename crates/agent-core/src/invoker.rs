//! Tool Invoker
//!
//! Executes one batch of tool calls against a [`ToolRegistry`]. Every call
//! yields exactly one [`ToolResult`], in request order, whatever happens to
//! its siblings.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::tool::{ToolCall, ToolFailureKind, ToolRegistry, ToolResult};

/// Invoker configuration
#[derive(Clone, Debug)]
pub struct InvokerConfig {
    /// Per-call timeout (`None` waits forever)
    pub timeout: Option<Duration>,

    /// Run the calls of one batch concurrently
    pub parallel: bool,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            parallel: true,
        }
    }
}

/// Executes requested tool calls
#[derive(Clone, Debug, Default)]
pub struct ToolInvoker {
    config: InvokerConfig,
}

impl ToolInvoker {
    pub const fn new(config: InvokerConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Execute a batch; the output is 1:1 with `calls` and in the same order
    pub async fn dispatch(
        &self,
        calls: &[ToolCall],
        registry: &ToolRegistry,
        cancel: &CancellationToken,
    ) -> Vec<ToolResult> {
        if !self.config.parallel || calls.len() < 2 {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.invoke_one(call, registry, cancel).await);
            }
            return results;
        }

        // Completion order is arbitrary; slot each result by request position.
        let mut slots: Vec<Option<ToolResult>> = vec![None; calls.len()];
        let mut pending: FuturesUnordered<_> = calls
            .iter()
            .enumerate()
            .map(|(idx, call)| async move { (idx, self.invoke_one(call, registry, cancel).await) })
            .collect();

        while let Some((idx, result)) = pending.next().await {
            slots[idx] = Some(result);
        }

        slots
            .into_iter()
            .zip(calls)
            .map(|(slot, call)| {
                slot.unwrap_or_else(|| {
                    ToolResult::failure(call, ToolFailureKind::Execution, "tool produced no result")
                })
            })
            .collect()
    }

    async fn invoke_one(
        &self,
        call: &ToolCall,
        registry: &ToolRegistry,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let tool = match registry.resolve(&call.name) {
            Ok(tool) => tool,
            Err(e) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, "Unknown tool requested");
                return ToolResult::failure(call, ToolFailureKind::UnknownTool, e.to_string());
            }
        };

        if let Err(e) = tool.validate(&call.arguments) {
            tracing::warn!(tool = %call.name, call_id = %call.id, error = %e, "Invalid tool arguments");
            return ToolResult::failure(call, ToolFailureKind::InvalidArguments, e.to_string());
        }

        tracing::debug!(tool = %call.name, call_id = %call.id, "Executing tool");
        let start = Instant::now();

        let execution = AssertUnwindSafe(tool.invoke(&call.arguments)).catch_unwind();
        let timed = async {
            match self.config.timeout {
                Some(limit) => tokio::time::timeout(limit, execution).await.ok(),
                None => Some(execution.await),
            }
        };

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return ToolResult::failure(call, ToolFailureKind::Cancelled, "turn was cancelled");
            }
            outcome = timed => outcome,
        };

        let elapsed_ms = start.elapsed().as_millis();
        let result = match outcome {
            None => ToolResult::failure(
                call,
                ToolFailureKind::TimedOut,
                format!(
                    "tool '{}' timed out after {} seconds",
                    call.name,
                    self.config.timeout.map_or(0, |d| d.as_secs())
                ),
            ),
            Some(Err(_)) => ToolResult::failure(
                call,
                ToolFailureKind::Panicked,
                format!("tool '{}' panicked", call.name),
            ),
            Some(Ok(Err(e))) => ToolResult::failure(call, ToolFailureKind::Execution, e.to_string()),
            Some(Ok(Ok(value))) => ToolResult::success(call, value),
        };

        match &result.error {
            None => tracing::debug!(tool = %call.name, call_id = %call.id, elapsed_ms, "Tool completed"),
            Some(failure) => tracing::warn!(
                tool = %call.name,
                call_id = %call.id,
                elapsed_ms,
                kind = ?failure.kind,
                "Tool failed: {}",
                failure.message
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AgentError, Result};
    use crate::tool::{Arguments, ParameterSchema, Tool, ToolDescriptor};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    /// Sleeps `delay_ms` then echoes its name
    struct SleepyTool {
        name: &'static str,
        delay_ms: u64,
    }

    #[async_trait]
    impl Tool for SleepyTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.name, "Sleeps then answers")
        }

        async fn invoke(&self, _arguments: &Arguments) -> Result<Value> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(json!(self.name))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("failing", "Always fails")
        }

        async fn invoke(&self, _arguments: &Arguments) -> Result<Value> {
            Err(AgentError::ToolExecution("search backend down".into()))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("panicking", "Panics")
        }

        async fn invoke(&self, _arguments: &Arguments) -> Result<Value> {
            panic!("tool bug")
        }
    }

    struct StrictTool;

    #[async_trait]
    impl Tool for StrictTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new("strict", "Needs a query")
                .parameter(ParameterSchema::required("query", "string", "Search query"))
        }

        async fn invoke(&self, _arguments: &Arguments) -> Result<Value> {
            Ok(json!("ok"))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(SleepyTool { name: "slow", delay_ms: 50 }).unwrap();
        registry.register(SleepyTool { name: "fast", delay_ms: 1 }).unwrap();
        registry.register(FailingTool).unwrap();
        registry.register(PanickingTool).unwrap();
        registry.register(StrictTool).unwrap();
        registry
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new(name, Arguments::new())
    }

    #[tokio::test]
    async fn test_dispatch_preserves_order() {
        let invoker = ToolInvoker::default();
        let calls = vec![call("slow"), call("fast"), call("slow"), call("fast")];

        let results = invoker.dispatch(&calls, &registry(), &CancellationToken::new()).await;

        assert_eq!(results.len(), calls.len());
        for (result, call) in results.iter().zip(&calls) {
            assert_eq!(result.call_id, call.id);
            assert_eq!(result.value, json!(call.name));
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_isolated() {
        let invoker = ToolInvoker::default();
        let calls = vec![call("fast"), call("no_such_tool"), call("slow")];

        let results = invoker.dispatch(&calls, &registry(), &CancellationToken::new()).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert_eq!(
            results[1].error.as_ref().unwrap().kind,
            ToolFailureKind::UnknownTool
        );
        assert!(results[2].is_success());
    }

    #[tokio::test]
    async fn test_failures_are_folded_into_results() {
        let invoker = ToolInvoker::default();
        let calls = vec![call("failing"), call("panicking"), call("strict"), call("fast")];

        let results = invoker.dispatch(&calls, &registry(), &CancellationToken::new()).await;

        let kinds: Vec<_> = results
            .iter()
            .map(|r| r.error.as_ref().map(|e| e.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(ToolFailureKind::Execution),
                Some(ToolFailureKind::Panicked),
                Some(ToolFailureKind::InvalidArguments),
                None,
            ]
        );
        assert!(results[0].error.as_ref().unwrap().message.contains("search backend down"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let invoker = ToolInvoker::new(InvokerConfig {
            timeout: Some(Duration::from_millis(5)),
            parallel: true,
        });

        let results = invoker
            .dispatch(&[call("slow"), call("fast")], &registry(), &CancellationToken::new())
            .await;

        assert_eq!(results[0].error.as_ref().unwrap().kind, ToolFailureKind::TimedOut);
        assert!(results[1].is_success());
    }

    #[tokio::test]
    async fn test_cancelled_batch() {
        let invoker = ToolInvoker::new(InvokerConfig {
            timeout: None,
            parallel: false,
        });
        let cancel = CancellationToken::new();
        cancel.cancel();

        let results = invoker.dispatch(&[call("slow"), call("fast")], &registry(), &cancel).await;

        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.error.as_ref().unwrap().kind == ToolFailureKind::Cancelled));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = ToolInvoker::default()
            .dispatch(&[], &registry(), &CancellationToken::new())
            .await;
        assert!(results.is_empty());
    }
}
