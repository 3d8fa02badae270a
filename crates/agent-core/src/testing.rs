//! Test Doubles
//!
//! A [`ReasoningClient`] that replays a fixed script, for driving the agent
//! loop without a live engine.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{AgentResponse, GenerationOptions, ReasoningClient};
use crate::tool::{ToolCall, ToolDescriptor};

type Responder = Box<dyn Fn(&[Message]) -> Result<AgentResponse> + Send + Sync>;

enum Step {
    Fixed(Result<AgentResponse>),
    Computed(Responder),
}

/// One recorded `infer` invocation
#[derive(Clone, Debug)]
pub struct RecordedInfer {
    pub system_instructions: String,
    pub transcript: Vec<Message>,
    pub tools: Vec<String>,
}

/// Replays queued responses in order and records what it was shown
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<RecordedInfer>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a final answer
    pub fn answer(self, content: impl Into<String>) -> Self {
        self.push(Step::Fixed(Ok(AgentResponse::FinalAnswer { content: content.into() })))
    }

    /// Queue a tool request
    pub fn request(self, calls: Vec<ToolCall>) -> Self {
        self.push(Step::Fixed(Ok(AgentResponse::ToolRequest { calls })))
    }

    /// Queue a failure
    pub fn fail(self, error: AgentError) -> Self {
        self.push(Step::Fixed(Err(error)))
    }

    /// Queue a response computed from the transcript it receives
    pub fn respond_with<F>(self, f: F) -> Self
    where
        F: Fn(&[Message]) -> Result<AgentResponse> + Send + Sync + 'static,
    {
        self.push(Step::Computed(Box::new(f)))
    }

    fn push(self, step: Step) -> Self {
        lock(&self.script).push_back(step);
        self
    }

    /// Every `infer` call so far, oldest first
    pub fn recorded(&self) -> Vec<RecordedInfer> {
        lock(&self.seen).clone()
    }

    /// Number of `infer` calls so far
    pub fn infer_count(&self) -> usize {
        lock(&self.seen).len()
    }

    /// Steps not yet consumed
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

#[async_trait]
impl ReasoningClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn infer(
        &self,
        system_instructions: &str,
        transcript: &[Message],
        tools: &[ToolDescriptor],
        _options: &GenerationOptions,
    ) -> Result<AgentResponse> {
        lock(&self.seen).push(RecordedInfer {
            system_instructions: system_instructions.to_string(),
            transcript: transcript.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });

        let step = lock(&self.script).pop_front();
        match step {
            Some(Step::Fixed(response)) => response,
            Some(Step::Computed(f)) => f(transcript),
            None => Err(AgentError::MalformedResponse("script exhausted".into())),
        }
    }
}
