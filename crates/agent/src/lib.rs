//! # DeepClaw Agent
//!
//! The agent execution loop, registry, and runtime facade. The runtime is
//! the boundary the transport layer talks to: create an agent, query its
//! state, deliver clarifications or continuations, and take stream handles.

pub mod agent;
pub mod prompt;
pub mod registry;

pub use agent::{AgentMode, ResearchAgent};
pub use registry::AgentRegistry;

use deepclaw_config::AppConfig;
use deepclaw_core::{
    AgentError, Error, Provider, ResearchContext, StreamingChannel,
};
use std::sync::Arc;
use tracing::info;

/// The external agent interface.
///
/// Holds the provider, the configuration, and the process-wide registry.
/// Every operation besides creation is a lookup plus a delegated call; none
/// of them mutate agent state on error.
pub struct AgentRuntime {
    provider: Arc<dyn Provider>,
    config: AppConfig,
    registry: AgentRegistry,
}

impl AgentRuntime {
    pub fn new(provider: Arc<dyn Provider>, config: AppConfig) -> Self {
        Self {
            provider,
            config,
            registry: AgentRegistry::new(),
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Create an agent for a task, register it, and start its loop on a
    /// background task. Returns the agent id and a stream handle.
    pub fn create_agent(
        &self,
        task: impl Into<String>,
        mode: AgentMode,
    ) -> Result<(String, StreamingChannel), Error> {
        let agent = ResearchAgent::new(task, mode, self.provider.clone(), &self.config)?;
        let id = agent.id().to_string();
        let stream = agent.stream_handle();

        self.registry.insert(agent.clone());
        tokio::spawn(agent.run());

        info!(agent_id = %id, %mode, "Agent created");
        Ok((id, stream))
    }

    /// A consistent snapshot of an agent's research context.
    pub fn get_status(&self, agent_id: &str) -> Result<ResearchContext, AgentError> {
        Ok(self.registry.get(agent_id)?.snapshot())
    }

    pub fn list_agents(&self) -> Vec<deepclaw_core::AgentSummary> {
        self.registry.list()
    }

    /// Deliver clarification text to a waiting agent; returns the agent's
    /// stream handle so the caller can watch research resume.
    pub fn submit_clarification(
        &self,
        agent_id: &str,
        text: impl Into<String>,
    ) -> Result<StreamingChannel, AgentError> {
        self.registry.get(agent_id)?.submit_clarification(text)
    }

    /// Continue an infinite-mode conversation (or stop it with a stop
    /// phrase).
    pub fn continue_conversation(
        &self,
        agent_id: &str,
        text: impl Into<String>,
    ) -> Result<StreamingChannel, AgentError> {
        self.registry.get(agent_id)?.continue_conversation(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deepclaw_core::{
        AgentState, Message, MessageToolCall, ProviderError, ProviderRequest, ProviderResponse,
    };
    use std::time::Duration;
    use tempfile::TempDir;

    struct AnswerProvider;

    #[async_trait]
    impl Provider for AnswerProvider {
        fn name(&self) -> &str {
            "answer"
        }
        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant_with_tool_calls(
                    "",
                    vec![MessageToolCall::new(
                        "final_answer",
                        r#"{"answer":"All done."}"#,
                    )],
                ),
                usage: None,
                model: request.model,
            })
        }
    }

    fn runtime_in(dir: &TempDir) -> AgentRuntime {
        let config = AppConfig {
            paths: deepclaw_config::PathsConfig {
                memory_dir: Some(dir.path().join("memory")),
                reports_dir: Some(dir.path().join("reports")),
                logs_dir: Some(dir.path().join("logs")),
            },
            ..AppConfig::default()
        };
        AgentRuntime::new(Arc::new(AnswerProvider), config)
    }

    #[tokio::test]
    async fn create_and_query_agent() {
        let dir = TempDir::new().unwrap();
        let runtime = runtime_in(&dir);

        let (id, _stream) = runtime
            .create_agent("Survey Rust HTTP clients", AgentMode::Bounded)
            .unwrap();

        // Status is available immediately and after completion.
        assert!(runtime.get_status(&id).is_ok());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while runtime.get_status(&id).unwrap().state != AgentState::Completed {
            assert!(tokio::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let summaries = runtime.list_agents();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].agent_id, id);
    }

    #[tokio::test]
    async fn operations_on_unknown_agent_return_not_found() {
        let dir = TempDir::new().unwrap();
        let runtime = runtime_in(&dir);

        assert!(matches!(
            runtime.get_status("research_missing"),
            Err(AgentError::NotFound(_))
        ));
        assert!(matches!(
            runtime.submit_clarification("research_missing", "text"),
            Err(AgentError::NotFound(_))
        ));
        assert!(matches!(
            runtime.continue_conversation("chat_missing", "text"),
            Err(AgentError::NotFound(_))
        ));
    }
}
