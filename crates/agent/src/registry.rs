//! Process-wide agent registry.
//!
//! Insert-only for the process lifetime: agents are registered at creation
//! and never evicted, so a completed or failed agent stays queryable. The
//! registry is an injectable value, not a global.

use crate::agent::ResearchAgent;
use deepclaw_core::{AgentError, AgentSummary};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, Arc<ResearchAgent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, agent: Arc<ResearchAgent>) {
        self.agents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(agent.id().to_string(), agent);
    }

    pub fn get(&self, agent_id: &str) -> Result<Arc<ResearchAgent>, AgentError> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(agent_id)
            .cloned()
            .ok_or_else(|| AgentError::NotFound(agent_id.to_string()))
    }

    /// Summaries of every registered agent, newest first.
    pub fn list(&self) -> Vec<AgentSummary> {
        let mut summaries: Vec<_> = self
            .agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|agent| agent.summary())
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    pub fn len(&self) -> usize {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
