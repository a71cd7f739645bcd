//! Token counting and context-window budget management.
//!
//! [`TokenCounter`] estimates the token cost of a conversation;
//! [`ContextWindowManager`] owns a fixed token budget and reduces an
//! oversized conversation to a trimmed projection that fits. The projection
//! is ephemeral — it is used for exactly one outbound reasoning-engine call
//! and never replaces the authoritative conversation log.

pub mod tokens;
pub mod window;

pub use tokens::TokenCounter;
pub use window::{ContextWindowConfig, ContextWindowManager};
