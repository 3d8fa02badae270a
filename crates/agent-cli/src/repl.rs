//! Interactive prompt loop

use agent_core::{AgentLoop, ChatChain, Result, Transcript};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

const EXIT_WORDS: [&str; 3] = ["sair", "exit", "quit"];

/// What answers each input
pub enum Assistant {
    Agent(AgentLoop),
    Chat(ChatChain),
}

impl Assistant {
    async fn respond(
        &self,
        input: &str,
        transcript: &mut Transcript,
        cancel: &CancellationToken,
    ) -> Result<String> {
        match self {
            Self::Agent(agent) => agent.run_turn_with_cancel(input, transcript, cancel).await,
            Self::Chat(chain) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(agent_core::AgentError::Cancelled),
                    answer = chain.ask(input, transcript) => answer,
                }
            }
        }
    }
}

/// What the loop should do with one line of input
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Exit,
    Skip,
    Ask(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Input::Skip
    } else if EXIT_WORDS.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
        Input::Exit
    } else {
        Input::Ask(trimmed)
    }
}

/// Read questions from stdin until an exit word, EOF or Ctrl-C at the prompt
pub async fn run(assistant: Assistant) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut transcript = Transcript::new();

    loop {
        print_prompt()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let question = match classify(&line) {
            Input::Exit => break,
            Input::Skip => continue,
            Input::Ask(question) => question,
        };

        // Ctrl-C during a turn abandons the turn, not the session
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let result = assistant.respond(question, &mut transcript, &cancel).await;
        watcher.abort();

        match result {
            Ok(answer) => println!("\nAssistant: {answer}\n"),
            Err(e) => {
                tracing::warn!(error = %e, "Turn failed");
                println!("\n{}\n", e.user_message());
            }
        }
    }

    tracing::info!(messages = transcript.len(), "Session ended");
    println!("Goodbye!");
    Ok(())
}

fn print_prompt() -> std::io::Result<()> {
    use std::io::Write;

    let mut stdout = std::io::stdout();
    write!(stdout, "You: ")?;
    stdout.flush()
}
