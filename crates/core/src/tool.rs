//! The tool invocation contract.
//!
//! Tool semantics live in `deepclaw-tools` as a closed set of tagged
//! variants. This module only defines what a tool reports back to the
//! execution loop: a plain value, or a state-transition request. Failures
//! travel as [`crate::error::ToolError`].

use crate::state::Source;
use serde::{Deserialize, Serialize};

/// The effect of a successful tool invocation on the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolEffect {
    /// A plain result: recorded into the conversation, loop continues.
    Output {
        content: String,
        /// References discovered during the invocation (e.g. search hits).
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        sources: Vec<Source>,
    },

    /// The agent needs human input before it can proceed.
    AwaitClarification { questions: String },

    /// The agent believes the task is done. Bounded agents complete on
    /// this; infinite agents treat it as another reason to pause for input
    /// unless an external stop was recorded.
    Complete { answer: String },
}

impl ToolEffect {
    /// Shorthand for a source-less output effect.
    pub fn output(content: impl Into<String>) -> Self {
        Self::Output {
            content: content.into(),
            sources: Vec::new(),
        }
    }

    /// The text recorded into the conversation as the tool result.
    pub fn content(&self) -> &str {
        match self {
            Self::Output { content, .. } => content,
            Self::AwaitClarification { questions } => questions,
            Self::Complete { answer } => answer,
        }
    }
}
