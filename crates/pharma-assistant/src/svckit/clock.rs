//! Current Time Tool
//!
//! Reports the wall-clock time in Brasília (UTC−03:00; Brazil has no DST).

use std::sync::Arc;

use agent_core::{
    error::{AgentError, Result as CoreResult},
    Arguments, ParameterSchema, Tool, ToolDescriptor,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::error::AssistantError;

/// Source of "now"
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Brasília is three hours behind UTC
const BRASILIA_OFFSET_SECS: i32 = 3 * 3600;

/// Tool for reading the current date and time
pub struct CurrentTimeTool {
    clock: Clock,
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentTimeTool {
    /// Use the system clock
    pub fn new() -> Self {
        Self {
            clock: Arc::new(Utc::now),
        }
    }

    /// Use a custom clock (tests, replay)
    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    fn now_local(&self) -> Result<DateTime<FixedOffset>, AssistantError> {
        let offset = FixedOffset::west_opt(BRASILIA_OFFSET_SECS)
            .ok_or_else(|| AssistantError::Clock("invalid Brasília offset".into()))?;
        Ok((self.clock)().with_timezone(&offset))
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "get_current_time",
            "Returns the current date and time in Brasília (São Paulo). \
             Use it whenever the answer depends on today's date or the time of day.",
        )
        .parameter(
            ParameterSchema::optional("format", "string", "Output format: human, iso or unix")
                .with_default(json!("human"))
                .with_enum(vec![json!("human"), json!("iso"), json!("unix")]),
        )
    }

    async fn invoke(&self, arguments: &Arguments) -> CoreResult<Value> {
        let now = self.now_local()?;
        let format = arguments
            .get("format")
            .and_then(Value::as_str)
            .unwrap_or("human");

        match format {
            "human" => Ok(json!(format!(
                "Current date and time: {} (Brasília time)",
                now.format("%d/%m/%Y %H:%M:%S")
            ))),
            "iso" => Ok(json!(now.to_rfc3339_opts(SecondsFormat::Secs, false))),
            "unix" => Ok(json!(now.timestamp())),
            other => Err(AgentError::ToolValidation(format!(
                "Unsupported format: {other}"
            ))),
        }
    }
}
