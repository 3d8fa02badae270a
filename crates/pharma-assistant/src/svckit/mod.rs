//! Service Kit - Agent Tools
//!
//! Domain tools that implement `agent_core::Tool` for the assistant.

mod clock;
mod web_search;

pub use clock::{Clock, CurrentTimeTool};
pub use web_search::{WebSearchTool, DEFAULT_MAX_RESULTS};
