//! Text Tool-Call Protocol
//!
//! For engines without native function calling: tools are described in the
//! system prompt and requested with fenced JSON blocks.
//!
//! ````text
//! ```tool
//! {"tool": "get_current_time", "arguments": {"format": "human"}}
//! ```
//! ````

use std::fmt::Write as _;

use serde::Deserialize;

use crate::error::{AgentError, Result};
use crate::provider::AgentResponse;
use crate::tool::{generate_call_id, Arguments, ToolCall, ToolDescriptor};

const TOOL_FENCE: &str = "```tool";
const FENCE_END: &str = "```";

/// Wire shape of one requested call
#[derive(Deserialize)]
struct RawToolCall {
    tool: String,
    #[serde(default)]
    arguments: Arguments,
    #[serde(default)]
    id: Option<String>,
}

impl From<RawToolCall> for ToolCall {
    fn from(raw: RawToolCall) -> Self {
        Self {
            id: raw.id.unwrap_or_else(generate_call_id),
            name: raw.tool,
            arguments: raw.arguments,
        }
    }
}

/// Generate the system prompt section describing available tools
pub fn render_tool_section(tools: &[ToolDescriptor]) -> String {
    let mut prompt = String::from("## Available Tools\n\n");
    prompt.push_str("You can use the following tools by responding with a JSON block:\n\n");
    prompt.push_str("```tool\n{\"tool\": \"tool_name\", \"arguments\": {\"arg\": \"value\"}}\n```\n\n");
    prompt.push_str("Use one block per call. You may request several tools at once. ");
    prompt.push_str("After receiving tool results, answer the user in plain text without tool blocks.\n\n");

    for tool in tools {
        let _ = writeln!(prompt, "### {}", tool.name);
        let _ = writeln!(prompt, "{}", tool.description);

        if !tool.parameters.is_empty() {
            prompt.push_str("**Parameters:**\n");
            for param in &tool.parameters {
                let required = if param.required { " (required)" } else { "" };
                let _ = writeln!(
                    prompt,
                    "- `{}` ({}){}: {}",
                    param.name, param.param_type, required, param.description
                );
            }
        }
        prompt.push('\n');
    }

    prompt
}

/// Re-encode an assistant tool request so the model sees its own calls
pub fn render_tool_calls(calls: &[ToolCall]) -> String {
    calls
        .iter()
        .map(|call| {
            let body = serde_json::json!({
                "tool": call.name,
                "arguments": call.arguments,
                "id": call.id,
            });
            format!("{TOOL_FENCE}\n{body}\n{FENCE_END}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classify engine text into a final answer or a tool request
pub fn parse_response(content: &str) -> Result<AgentResponse> {
    let mut calls = parse_fenced_calls(content)?;

    if calls.is_empty()
        && let Some(call) = parse_inline_call(content)
    {
        calls.push(call);
    }

    if calls.is_empty() {
        return AgentResponse::classify(content.trim(), calls);
    }
    AgentResponse::classify(String::new(), calls)
}

/// Every ```tool block, in order
fn parse_fenced_calls(content: &str) -> Result<Vec<ToolCall>> {
    let mut calls = Vec::new();
    let mut rest = content;

    while let Some(start_idx) = rest.find(TOOL_FENCE) {
        let after_marker = &rest[start_idx + TOOL_FENCE.len()..];
        let Some(end_idx) = after_marker.find(FENCE_END) else {
            return Err(AgentError::MalformedResponse("unterminated tool block".into()));
        };

        let json_str = after_marker[..end_idx].trim();
        let raw: RawToolCall = serde_json::from_str(json_str).map_err(|e| {
            AgentError::MalformedResponse(format!("tool block is not a valid call: {e}"))
        })?;
        calls.push(raw.into());

        rest = &after_marker[end_idx + FENCE_END.len()..];
    }

    Ok(calls)
}

/// Fallback: a bare JSON object with a "tool" key
fn parse_inline_call(content: &str) -> Option<ToolCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    serde_json::from_str::<RawToolCall>(&content[start..=end])
        .ok()
        .map(ToolCall::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ParameterSchema;

    #[test]
    fn test_parse_single_tool_call() {
        let content = r#"Let me check that for you.
```tool
{"tool": "get_current_time", "arguments": {"format": "iso"}}
```"#;

        let AgentResponse::ToolRequest { calls } = parse_response(content).unwrap() else {
            panic!("expected a tool request");
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_current_time");
        assert_eq!(calls[0].arguments["format"], "iso");
        assert!(calls[0].id.starts_with("call_"));
    }

    #[test]
    fn test_parse_multiple_tool_calls_in_order() {
        let content = r#"```tool
{"tool": "tavily_search", "arguments": {"query": "ibuprofeno dose"}, "id": "a"}
```
```tool
{"tool": "get_current_time", "id": "b"}
```"#;

        let AgentResponse::ToolRequest { calls } = parse_response(content).unwrap() else {
            panic!("expected a tool request");
        };
        let ids: Vec<_> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(calls[1].arguments.is_empty());
    }

    #[test]
    fn test_parse_inline_call() {
        let content = r#"{"tool": "get_current_time", "arguments": {}}"#;
        assert!(matches!(
            parse_response(content).unwrap(),
            AgentResponse::ToolRequest { .. }
        ));
    }

    #[test]
    fn test_parse_final_answer() {
        let response = parse_response("  Take 500mg every 6 hours.  ").unwrap();
        assert_eq!(
            response,
            AgentResponse::FinalAnswer { content: "Take 500mg every 6 hours.".into() }
        );
    }

    #[test]
    fn test_parse_broken_block_is_malformed() {
        let content = "```tool\n{\"tool\": \"get_current_time\", \n```";
        assert!(matches!(
            parse_response(content),
            Err(AgentError::MalformedResponse(_))
        ));

        let unterminated = "```tool\n{\"tool\": \"get_current_time\"}";
        assert!(parse_response(unterminated).is_err());
    }

    #[test]
    fn test_parse_repeated_ids_are_made_unique() {
        let text = "```tool\n{\"tool\": \"a\", \"id\": \"x\"}\n```\n\
                    ```tool\n{\"tool\": \"b\", \"id\": \"x\"}\n```";

        let AgentResponse::ToolRequest { calls } = parse_response(text).unwrap() else {
            panic!("expected a tool request");
        };

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "x");
        assert_ne!(calls[1].id, "x");
        assert_eq!(calls[1].name, "b");
    }

    #[test]
    fn test_parse_empty_is_malformed() {
        assert!(matches!(parse_response(""), Err(AgentError::MalformedResponse(_))));
    }

    #[test]
    fn test_rendered_calls_parse_back() {
        let call = ToolCall::new("tavily_search", Arguments::new()).with_id("x1");
        let rendered = render_tool_calls(std::slice::from_ref(&call));

        let AgentResponse::ToolRequest { calls } = parse_response(&rendered).unwrap() else {
            panic!("expected a tool request");
        };
        assert_eq!(calls, vec![call]);
    }

    #[test]
    fn test_render_tool_section() {
        let tools = vec![ToolDescriptor::new("tavily_search", "Search the web")
            .parameter(ParameterSchema::required("query", "string", "Search query"))];
        let section = render_tool_section(&tools);

        assert!(section.contains("### tavily_search"));
        assert!(section.contains("`query` (string) (required)"));
    }
}
