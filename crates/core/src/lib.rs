//! # DeepClaw Core
//!
//! Domain types, traits, and error definitions for the DeepClaw research
//! agent runtime. This crate has no framework dependencies beyond serde and
//! tokio's sync primitives — it defines the domain model that all other
//! crates implement against.
//!
//! ## Design Philosophy
//!
//! The reasoning engine is a trait here; its implementations live in
//! `deepclaw-providers`. Tool semantics live in `deepclaw-tools`; this crate
//! only defines the effect contract a tool reports back to the loop. The
//! agent state machine is a pure transition function so it can be tested
//! exhaustively without an agent around it.

pub mod error;
pub mod gate;
pub mod message;
pub mod provider;
pub mod state;
pub mod stream;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, Error, ProviderError, Result, ToolError};
pub use gate::ResumeGate;
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition, Usage};
pub use state::{AgentEvent, AgentState, AgentSummary, ResearchContext, Source};
pub use stream::StreamingChannel;
pub use tool::ToolEffect;
