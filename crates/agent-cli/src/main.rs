//! Pharmaceutical Assistant CLI
//!
//! Terminal chat with the pharmaceutical assistant. Answers come from Gemini
//! (default) or a local Ollama server; in agent mode the assistant can read
//! the clock and search the web.

mod config;
mod repl;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentLoop, ChatChain, ReasoningClient};
use agent_runtime::{GeminiClient, OllamaClient};
use pharma_assistant::{default_registry, SearchClient, TavilyClient};

use crate::config::{Cli, Mode, Provider};
use crate::repl::Assistant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment before flags so env fallbacks see .env values
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout is the conversation
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,agent_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let client = connect(cli.provider).await?;
    let config = cli.agent_config();

    let assistant = match cli.mode {
        Mode::Chat => Assistant::Chat(ChatChain::new(client, config)),
        Mode::Agent => {
            let search = if cli.no_search { None } else { search_client() };
            let tools = default_registry(search).context("failed to register tools")?;

            tracing::info!("Registered {} tools:", tools.len());
            for name in tools.names() {
                tracing::info!("  • {}", name);
            }

            Assistant::Agent(AgentLoop::new(client, Arc::new(tools), config))
        }
    };

    println!("=== Pharmaceutical Assistant ===");
    println!(
        "Engine: {:?} ({}), mode: {:?}",
        cli.provider,
        cli.model(),
        cli.mode
    );
    println!("Type 'sair', 'exit' or 'quit' to leave.\n");

    repl::run(assistant).await
}

/// Build the reasoning client and report whether it is reachable
async fn connect(provider: Provider) -> anyhow::Result<Arc<dyn ReasoningClient>> {
    let client: Arc<dyn ReasoningClient> = match provider {
        Provider::Gemini => Arc::new(
            GeminiClient::from_env().context("Gemini needs GEMINI_API_KEY (or GOOGLE_API_KEY)")?,
        ),
        Provider::Ollama => Arc::new(OllamaClient::from_env()),
    };

    match client.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to {}", client.name()),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ {} not reachable - questions will fail", client.name());
            if provider == Provider::Ollama {
                tracing::warn!("  Make sure Ollama is running: ollama serve");
            }
        }
    }

    Ok(client)
}

fn search_client() -> Option<Arc<dyn SearchClient>> {
    match TavilyClient::from_env() {
        Ok(client) => {
            tracing::info!("✓ Web search configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("⚠ Web search disabled: {}", e);
            None
        }
    }
}
