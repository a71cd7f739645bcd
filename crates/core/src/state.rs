//! Agent state machine and per-agent research context.
//!
//! The transition table is a pure function so every (state, event) pair can
//! be tested exhaustively. Terminal states absorb all events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle states of a research agent.
///
/// `Researching` and `WaitingForClarification` may alternate arbitrarily
/// many times; `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Created,
    Researching,
    WaitingForClarification,
    Completed,
    Failed,
}

impl AgentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The total transition function. Every defined event maps to exactly
    /// one next state; events that do not apply in a state leave it
    /// unchanged, and no event mutates a terminal state.
    pub fn next(self, event: AgentEvent) -> AgentState {
        use AgentEvent::*;
        use AgentState::*;

        if self.is_terminal() {
            return self;
        }

        match (self, event) {
            (Created, Started) => Researching,

            (Researching, ClarificationRequested) => WaitingForClarification,
            (Researching, AnswerReady) => Completed,

            (WaitingForClarification, ClarificationReceived) => Researching,

            // Externally driven terminations apply from any live state.
            (_, StopReceived) => Completed,
            (_, Errored) => Failed,
            (_, LimitExhausted) => Failed,

            // Everything else is a no-op self transition.
            (state, _) => state,
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Researching => "researching",
            Self::WaitingForClarification => "waiting_for_clarification",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Input events driving the agent state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentEvent {
    /// The execution loop started.
    Started,
    /// A tool asked for human input.
    ClarificationRequested,
    /// An external actor delivered the input.
    ClarificationReceived,
    /// A final answer was produced (bounded mode completes on this).
    AnswerReady,
    /// An external stop phrase was recorded.
    StopReceived,
    /// The loop body raised an unrecovered error.
    Errored,
    /// A bounded-mode ceiling was exceeded.
    LimitExhausted,
}

/// A reference discovered during research (search hit, cited page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Mutable per-agent research context.
///
/// Exactly one per agent instance. The execution loop is the only writer;
/// external readers take a [`ResearchContext::snapshot`] copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchContext {
    pub state: AgentState,

    /// Strictly increases by one per loop pass; never decreases.
    pub iteration: u64,

    /// Discovered references, deduplicated by URL, in discovery order.
    pub sources: Vec<Source>,

    /// The last structural decision's reasoning text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_reasoning: Option<String>,

    pub clarifications_used: u32,
    pub searches_used: u32,
    pub tool_calls_made: u32,
}

impl ResearchContext {
    pub fn new() -> Self {
        Self {
            state: AgentState::Created,
            iteration: 0,
            sources: Vec::new(),
            current_step_reasoning: None,
            clarifications_used: 0,
            searches_used: 0,
            tool_calls_made: 0,
        }
    }

    /// Apply an event to the state machine.
    pub fn apply(&mut self, event: AgentEvent) {
        let next = self.state.next(event);
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, ?event, "Agent state transition");
            self.state = next;
        }
    }

    /// Record discovered sources, skipping URLs already seen.
    pub fn record_sources(&mut self, new: Vec<Source>) {
        for source in new {
            if !self.sources.iter().any(|s| s.url == source.url) {
                self.sources.push(source);
            }
        }
    }

    /// A consistent copy for external readers (status queries).
    pub fn snapshot(&self) -> ResearchContext {
        self.clone()
    }
}

impl Default for ResearchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only summary of an agent exposed by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub task: String,
    pub state: AgentState,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [AgentState; 5] = [
        AgentState::Created,
        AgentState::Researching,
        AgentState::WaitingForClarification,
        AgentState::Completed,
        AgentState::Failed,
    ];

    const ALL_EVENTS: [AgentEvent; 7] = [
        AgentEvent::Started,
        AgentEvent::ClarificationRequested,
        AgentEvent::ClarificationReceived,
        AgentEvent::AnswerReady,
        AgentEvent::StopReceived,
        AgentEvent::Errored,
        AgentEvent::LimitExhausted,
    ];

    #[test]
    fn transition_table_is_total() {
        // Every (state, event) pair maps to exactly one state without panic.
        for state in ALL_STATES {
            for event in ALL_EVENTS {
                let _ = state.next(event);
            }
        }
    }

    #[test]
    fn terminal_states_absorb_all_events() {
        for state in [AgentState::Completed, AgentState::Failed] {
            for event in ALL_EVENTS {
                assert_eq!(state.next(event), state);
            }
        }
    }

    #[test]
    fn clarification_cycle() {
        let state = AgentState::Created.next(AgentEvent::Started);
        assert_eq!(state, AgentState::Researching);

        let state = state.next(AgentEvent::ClarificationRequested);
        assert_eq!(state, AgentState::WaitingForClarification);

        let state = state.next(AgentEvent::ClarificationReceived);
        assert_eq!(state, AgentState::Researching);
    }

    #[test]
    fn stop_completes_from_any_live_state() {
        assert_eq!(
            AgentState::Researching.next(AgentEvent::StopReceived),
            AgentState::Completed
        );
        assert_eq!(
            AgentState::WaitingForClarification.next(AgentEvent::StopReceived),
            AgentState::Completed
        );
    }

    #[test]
    fn error_fails_from_any_live_state() {
        assert_eq!(
            AgentState::Researching.next(AgentEvent::Errored),
            AgentState::Failed
        );
        assert_eq!(
            AgentState::WaitingForClarification.next(AgentEvent::Errored),
            AgentState::Failed
        );
    }

    #[test]
    fn sources_deduplicate_by_url() {
        let mut ctx = ResearchContext::new();
        ctx.record_sources(vec![
            Source {
                title: "Tokio".into(),
                url: "https://tokio.rs".into(),
                snippet: None,
            },
            Source {
                title: "Tokio (again)".into(),
                url: "https://tokio.rs".into(),
                snippet: None,
            },
            Source {
                title: "Axum".into(),
                url: "https://docs.rs/axum".into(),
                snippet: None,
            },
        ]);
        assert_eq!(ctx.sources.len(), 2);
        assert_eq!(ctx.sources[0].title, "Tokio");
    }

    #[test]
    fn snapshot_is_independent_copy() {
        let mut ctx = ResearchContext::new();
        ctx.apply(AgentEvent::Started);
        let snap = ctx.snapshot();
        ctx.iteration = 10;
        assert_eq!(snap.iteration, 0);
        assert_eq!(snap.state, AgentState::Researching);
    }
}
