//! Command-line configuration

use std::time::Duration;

use agent_core::AgentConfig;
use clap::{Parser, ValueEnum};
use pharma_assistant::PHARMA_ASSISTANT_PROMPT;

/// Reasoning engine backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// Google Gemini (needs GEMINI_API_KEY)
    Gemini,
    /// Local Ollama server
    Ollama,
}

impl Provider {
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::Ollama => "llama3.2",
        }
    }
}

/// How each input is answered
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Reason/act loop with tools
    Agent,
    /// One engine call per input, no tools
    Chat,
}

/// Pharmaceutical assistant in the terminal
#[derive(Debug, Parser)]
#[command(name = "pharma-assistant", version, about)]
pub struct Cli {
    /// Reasoning engine
    #[arg(long, value_enum, env = "PHARMA_PROVIDER", default_value_t = Provider::Gemini)]
    pub provider: Provider,

    /// Model name (defaults per provider)
    #[arg(long, env = "PHARMA_MODEL")]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long, env = "PHARMA_TEMPERATURE", default_value_t = 0.2)]
    pub temperature: f32,

    /// Reasoning steps allowed per question
    #[arg(long, env = "PHARMA_MAX_CYCLES", default_value_t = 10)]
    pub max_cycles: usize,

    /// Agent loop with tools, or plain chat
    #[arg(long, value_enum, env = "PHARMA_MODE", default_value_t = Mode::Agent)]
    pub mode: Mode,

    /// Do not register the web search tool
    #[arg(long, env = "PHARMA_NO_SEARCH")]
    pub no_search: bool,

    /// Seconds to wait for one engine response
    #[arg(long, env = "PHARMA_INFER_TIMEOUT", default_value_t = 120)]
    pub infer_timeout: u64,
}

impl Cli {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// Agent configuration for these flags
    pub fn agent_config(&self) -> AgentConfig {
        let mut config = AgentConfig {
            system_prompt: PHARMA_ASSISTANT_PROMPT.into(),
            max_cycles: self.max_cycles,
            infer_timeout: Some(Duration::from_secs(self.infer_timeout)),
            ..AgentConfig::default()
        };
        config.generation.model = self.model();
        config.generation.temperature = self.temperature;
        config
    }
}
