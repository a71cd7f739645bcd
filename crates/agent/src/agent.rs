//! The agent execution loop.
//!
//! One `ResearchAgent` owns one conversation, one research context, one
//! resume gate, and one output stream. The loop task is the only writer of
//! the context; external handlers (clarification, continuation) append user
//! messages and open the gate, and status queries take snapshots.
//!
//! Two modes share the loop. Bounded mode forces a tool call every
//! iteration and terminates on `final_answer` or on a ceiling. Infinite
//! mode never self-terminates: a produced answer is just another reason to
//! pause for the next user message, and only an external stop phrase
//! completes the agent.

use crate::prompt;
use chrono::{DateTime, Utc};
use deepclaw_config::{AgentLimitsConfig, AppConfig};
use deepclaw_context::{ContextWindowConfig, ContextWindowManager};
use deepclaw_core::{
    AgentError, AgentEvent, AgentState, AgentSummary, Conversation, Error, Message, Provider,
    ProviderRequest, ResearchContext, ResumeGate, StreamingChannel, ToolChoice, ToolEffect,
};
use deepclaw_tools::{ToolCommand, ToolEnv};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Phrases that terminate an infinite-mode agent, matched case-insensitively
/// against the trimmed continuation text.
const STOP_PHRASES: [&str; 3] = ["stop", "finish", "end"];

/// Execution mode of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// Research-to-completion with hard ceilings.
    Bounded,
    /// Open-ended conversation terminated only by a stop phrase.
    Infinite,
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bounded => write!(f, "research"),
            Self::Infinite => write!(f, "chat"),
        }
    }
}

/// A single long-lived research agent.
pub struct ResearchAgent {
    id: String,
    task: String,
    mode: AgentMode,
    created_at: DateTime<Utc>,

    provider: Arc<dyn Provider>,
    window: ContextWindowManager,
    limits: AgentLimitsConfig,
    model: String,
    temperature: f32,
    max_response_tokens: u32,

    conversation: Mutex<Conversation>,
    context: RwLock<ResearchContext>,
    gate: ResumeGate,
    stream: StreamingChannel,
    stop_requested: AtomicBool,

    tool_env: ToolEnv,
    logs_dir: PathBuf,
}

impl ResearchAgent {
    /// Build an agent for a task. The conversation is seeded with the task
    /// as the initial user message; call [`ResearchAgent::run`] to start.
    pub fn new(
        task: impl Into<String>,
        mode: AgentMode,
        provider: Arc<dyn Provider>,
        config: &AppConfig,
    ) -> Result<Arc<Self>, Error> {
        let task = task.into();
        let id = format!("{mode}_{}", Uuid::new_v4().simple());

        let window = ContextWindowManager::new(ContextWindowConfig {
            max_tokens: config.context.max_tokens,
            system_prompt_reserve: config.context.system_prompt_reserve,
            response_reserve: config.default_max_tokens as usize,
            model: config.default_model.clone(),
            keep_recent: config.context.keep_recent,
            minimal_tail: config.context.minimal_tail,
            ..ContextWindowConfig::default()
        })?;

        let tool_env = ToolEnv::new(
            config.paths.memory_dir().join(&id),
            config.paths.reports_dir(),
            config.search.clone(),
        );

        let mut conversation = Conversation::new();
        conversation.push(Message::user(task.clone()));

        Ok(Arc::new(Self {
            id,
            task,
            mode,
            created_at: Utc::now(),
            provider,
            window,
            limits: config.agent.clone(),
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_response_tokens: config.default_max_tokens,
            conversation: Mutex::new(conversation),
            context: RwLock::new(ResearchContext::new()),
            gate: ResumeGate::new(),
            stream: StreamingChannel::new(),
            stop_requested: AtomicBool::new(false),
            tool_env,
            logs_dir: config.paths.logs_dir(),
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    /// Current state, read without blocking the loop.
    pub fn state(&self) -> AgentState {
        self.snapshot().state
    }

    /// A consistent copy of the research context.
    pub fn snapshot(&self) -> ResearchContext {
        self.context
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot()
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            agent_id: self.id.clone(),
            task: self.task.clone(),
            state: self.state(),
            created_at: self.created_at,
        }
    }

    /// A handle to the agent's output stream. Reading starts at the current
    /// buffer position, so a reattaching reader resumes where the previous
    /// one left off.
    pub fn stream_handle(&self) -> StreamingChannel {
        self.stream.clone()
    }

    /// Deliver clarification text to a waiting agent. Appends the text as a
    /// user message and releases the suspended loop.
    pub fn submit_clarification(
        &self,
        text: impl Into<String>,
    ) -> Result<StreamingChannel, AgentError> {
        let state = self.state();
        if state != AgentState::WaitingForClarification {
            return Err(AgentError::InvalidState {
                agent_id: self.id.clone(),
                state: state.to_string(),
            });
        }

        self.push_message(Message::user(text.into()));
        self.with_context(|ctx| ctx.apply(AgentEvent::ClarificationReceived));
        self.gate.open();

        info!(agent_id = %self.id, "Clarification received, resuming loop");
        Ok(self.stream_handle())
    }

    /// Continue an infinite-mode conversation with new user text. A stop
    /// phrase completes the agent instead; the suspended loop observes the
    /// terminal state at its next suspension point and exits.
    pub fn continue_conversation(
        &self,
        text: impl Into<String>,
    ) -> Result<StreamingChannel, AgentError> {
        if self.mode != AgentMode::Infinite {
            return Err(AgentError::NotInfinite(self.id.clone()));
        }
        let state = self.state();
        if state.is_terminal() {
            return Err(AgentError::InvalidState {
                agent_id: self.id.clone(),
                state: state.to_string(),
            });
        }

        let text = text.into();
        if is_stop_phrase(&text) {
            info!(agent_id = %self.id, "Stop phrase received");
            self.stop_requested.store(true, Ordering::Release);
            self.with_context(|ctx| ctx.apply(AgentEvent::StopReceived));
            self.gate.open();
            return Ok(self.stream_handle());
        }

        self.push_message(Message::user(text));
        self.with_context(|ctx| ctx.apply(AgentEvent::ClarificationReceived));
        self.gate.open();
        Ok(self.stream_handle())
    }

    /// Run the execution loop to completion. Exactly one call per agent;
    /// the loop task is the sole writer of conversation and context.
    pub async fn run(self: Arc<Self>) {
        self.with_context(|ctx| ctx.apply(AgentEvent::Started));
        info!(agent_id = %self.id, mode = %self.mode, "Agent started");

        if let Err(e) = self.run_inner().await {
            error!(agent_id = %self.id, error = %e, "Agent failed");
            self.stream.push(format!("\nAgent error: {e}\n"));
            self.with_context(|ctx| ctx.apply(AgentEvent::Errored));
        }

        self.stream.finish();
        self.persist_log();
        info!(agent_id = %self.id, state = %self.state(), "Agent finished");
    }

    async fn run_inner(&self) -> Result<(), Error> {
        loop {
            if self.state().is_terminal() {
                return Ok(());
            }
            if self.stop_requested.load(Ordering::Acquire) {
                self.with_context(|ctx| ctx.apply(AgentEvent::StopReceived));
                return Ok(());
            }

            let iteration = self.with_context(|ctx| {
                ctx.iteration += 1;
                ctx.iteration
            });

            if self.mode == AgentMode::Bounded && self.ceilings_exceeded(iteration) {
                self.stream
                    .push("\nResearch stopped: execution limits reached.\n");
                self.with_context(|ctx| ctx.apply(AgentEvent::LimitExhausted));
                return Ok(());
            }

            let response = self.provider.complete(self.build_request()).await?;
            debug!(
                agent_id = %self.id,
                iteration,
                tool_calls = response.message.tool_calls.len(),
                "Received reasoning decision"
            );
            self.push_message(response.message.clone());

            let Some(call) = response.message.tool_calls.first().cloned() else {
                // Content-only decision: surface it and pause for input.
                self.stream.push(format!("{}\n", response.message.content));
                self.pause_for_input().await;
                continue;
            };

            let command = match ToolCommand::parse(&call.name, &call.arguments) {
                Ok(command) => command,
                Err(e) => {
                    // Local recovery: the failure becomes a tool result the
                    // model can read and correct on the next pass.
                    warn!(agent_id = %self.id, tool = %call.name, error = %e, "Bad tool request");
                    self.push_message(Message::tool_result(&call.id, format!("Error: {e}")));
                    continue;
                }
            };

            self.with_context(|ctx| {
                ctx.tool_calls_made += 1;
                if matches!(command, ToolCommand::WebSearch(_)) {
                    ctx.searches_used += 1;
                }
                let reasoning = command.reasoning();
                if !reasoning.is_empty() {
                    ctx.current_step_reasoning = Some(reasoning.to_string());
                }
            });

            let effect = {
                let snapshot = self.snapshot();
                command.invoke(&snapshot, &self.tool_env).await
            };

            match effect {
                Err(e) => {
                    warn!(agent_id = %self.id, tool = command.name(), error = %e, "Tool failed");
                    self.push_message(Message::tool_result(&call.id, format!("Error: {e}")));
                }
                Ok(ToolEffect::Output { content, sources }) => {
                    self.push_message(Message::tool_result(&call.id, content.clone()));
                    self.with_context(|ctx| ctx.record_sources(sources));
                    self.stream.push(format!("{content}\n"));
                }
                Ok(ToolEffect::AwaitClarification { questions }) => {
                    self.push_message(Message::tool_result(&call.id, questions.clone()));
                    let used = self.with_context(|ctx| {
                        ctx.clarifications_used += 1;
                        ctx.clarifications_used
                    });
                    if self.mode == AgentMode::Bounded && used > self.limits.max_clarifications {
                        warn!(agent_id = %self.id, used, "Clarification ceiling exceeded");
                        self.with_context(|ctx| ctx.apply(AgentEvent::LimitExhausted));
                        return Ok(());
                    }
                    self.stream.push(format!("{questions}\n"));
                    self.pause_for_input().await;
                }
                Ok(ToolEffect::Complete { answer }) => {
                    self.push_message(Message::tool_result(&call.id, answer.clone()));
                    self.stream.push(format!("{answer}\n"));

                    if self.mode == AgentMode::Infinite
                        && !self.stop_requested.load(Ordering::Acquire)
                    {
                        // An answer is just another pause point: the session
                        // continues until the user says stop.
                        self.pause_for_input().await;
                    } else {
                        self.with_context(|ctx| ctx.apply(AgentEvent::AnswerReady));
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Outbound context: mode-specific system prompt + trimmed conversation.
    fn build_request(&self) -> ProviderRequest {
        let history = {
            let conversation = self
                .conversation
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            conversation.messages.clone()
        };
        let reduced = self.window.reduce(&history);

        let snapshot = self.snapshot();
        let system = match self.mode {
            AgentMode::Bounded => prompt::bounded(&snapshot, self.limits.max_clarifications),
            AgentMode::Infinite => prompt::infinite(&snapshot),
        };

        let mut messages = Vec::with_capacity(reduced.len() + 1);
        messages.push(Message::system(system));
        messages.extend(reduced);

        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: Some(self.max_response_tokens),
            tools: deepclaw_tools::definitions(),
            tool_choice: match self.mode {
                AgentMode::Bounded => ToolChoice::Required,
                AgentMode::Infinite => ToolChoice::Auto,
            },
        }
    }

    fn ceilings_exceeded(&self, iteration: u64) -> bool {
        let snapshot = self.snapshot();
        if iteration > self.limits.max_iterations {
            warn!(agent_id = %self.id, iteration, "Iteration ceiling exceeded");
            return true;
        }
        if snapshot.tool_calls_made >= self.limits.max_tool_calls {
            warn!(
                agent_id = %self.id,
                tool_calls = snapshot.tool_calls_made,
                "Tool-call ceiling exceeded"
            );
            return true;
        }
        false
    }

    /// Enter the clarification wait and park until an external actor opens
    /// the gate. The gate is closed before the waiting state becomes
    /// externally observable, so an open() triggered by a status read can
    /// only land after the close and is never erased.
    async fn pause_for_input(&self) {
        self.gate.close();
        self.with_context(|ctx| ctx.apply(AgentEvent::ClarificationRequested));
        debug!(agent_id = %self.id, "Loop suspended awaiting input");
        self.gate.wait().await;
        debug!(agent_id = %self.id, "Loop resumed");
    }

    fn push_message(&self, message: Message) {
        self.conversation
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }

    fn with_context<T>(&self, f: impl FnOnce(&mut ResearchContext) -> T) -> T {
        let mut ctx = self.context.write().unwrap_or_else(|e| e.into_inner());
        f(&mut ctx)
    }

    /// Persist the execution log: one JSON document per agent, written once
    /// at loop exit.
    fn persist_log(&self) {
        let record = ExecutionLog {
            agent_id: &self.id,
            task: &self.task,
            mode: self.mode.to_string(),
            created_at: self.created_at,
            finished_at: Utc::now(),
            context: self.snapshot(),
            messages: self
                .conversation
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .messages
                .clone(),
        };

        if let Err(e) = std::fs::create_dir_all(&self.logs_dir).and_then(|_| {
            let path = self.logs_dir.join(format!("{}.json", self.id));
            let json = serde_json::to_string_pretty(&record).unwrap_or_default();
            std::fs::write(path, json)
        }) {
            warn!(agent_id = %self.id, error = %e, "Failed to persist execution log");
        }
    }
}

fn is_stop_phrase(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    STOP_PHRASES.iter().any(|p| *p == normalized)
}

#[derive(Serialize)]
struct ExecutionLog<'a> {
    agent_id: &'a str,
    task: &'a str,
    mode: String,
    created_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    context: ResearchContext,
    messages: Vec<Message>,
}
