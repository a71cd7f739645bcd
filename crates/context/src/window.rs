//! Context-window budget management.
//!
//! The manager owns a fixed token budget and derives the ceiling available
//! for conversation history:
//!
//! `available = max_tokens - system_prompt_reserve - response_reserve`
//!
//! `reduce` trims an oversized conversation in layers: keep the initial
//! task and a recent tail, keep important middle messages (tool results and
//! high-value tool calls), replace the rest with one visible compression
//! marker, and fall back to a minimal first + marker + last-K projection if
//! that still exceeds the ceiling. Recency always outranks importance when
//! both compete for a retained slot: the tail is reserved before the middle
//! is classified.

use crate::tokens::TokenCounter;
use deepclaw_core::{Error, Message, Result, Role};
use tracing::{debug, warn};

/// Immutable configuration for a [`ContextWindowManager`].
#[derive(Debug, Clone)]
pub struct ContextWindowConfig {
    /// Maximum context window size in tokens.
    pub max_tokens: usize,
    /// Tokens reserved for the system prompt.
    pub system_prompt_reserve: usize,
    /// Tokens reserved for the model response.
    pub response_reserve: usize,
    /// Model name used to pick the tokenizer.
    pub model: String,
    /// How many most-recent messages are always retained.
    pub keep_recent: usize,
    /// Tail size of the minimal fallback projection.
    pub minimal_tail: usize,
    /// Tool names whose calls are retained as important middle messages.
    pub high_value_tools: Vec<String>,
}

impl Default for ContextWindowConfig {
    fn default() -> Self {
        Self {
            max_tokens: 70_000,
            system_prompt_reserve: 2_000,
            response_reserve: 12_000,
            model: "gpt-4".into(),
            keep_recent: 8,
            minimal_tail: 6,
            high_value_tools: vec![
                "final_answer".into(),
                "create_report".into(),
                "web_search".into(),
            ],
        }
    }
}

/// Reduces conversations to fit a token budget.
///
/// This component never raises after construction: `reduce` only ever
/// returns a (possibly unmodified, possibly degraded) conversation. Callers
/// observe the degree of compression via logs.
pub struct ContextWindowManager {
    config: ContextWindowConfig,
    counter: TokenCounter,
    available_tokens: usize,
}

impl ContextWindowManager {
    /// Build a manager. Fails if the reserves leave no room for history —
    /// that is a configuration error, fatal at construction.
    pub fn new(config: ContextWindowConfig) -> Result<Self> {
        let reserved = config.system_prompt_reserve + config.response_reserve;
        if config.max_tokens <= reserved {
            return Err(Error::Config {
                message: format!(
                    "context budget exhausted by reserves: max_tokens={} <= system_prompt_reserve={} + response_reserve={}",
                    config.max_tokens, config.system_prompt_reserve, config.response_reserve
                ),
            });
        }
        let available_tokens = config.max_tokens - reserved;
        let counter = TokenCounter::for_model(&config.model);
        Ok(Self {
            config,
            counter,
            available_tokens,
        })
    }

    /// The ceiling available for conversation history.
    pub fn available_tokens(&self) -> usize {
        self.available_tokens
    }

    /// Token cost of a message list.
    pub fn count(&self, messages: &[Message]) -> usize {
        self.counter.count(messages)
    }

    /// Reduce a conversation to fit `available_tokens`.
    ///
    /// Returns the input unchanged when it already fits (the common case).
    /// The result is a derived projection for one outbound call; the
    /// authoritative log is untouched.
    pub fn reduce(&self, messages: &[Message]) -> Vec<Message> {
        let current = self.counter.count(messages);
        if current <= self.available_tokens {
            return messages.to_vec();
        }

        // A projection already in minimal shape is a fixed point: trimming
        // it further would only stack markers.
        if self.is_minimal_shape(messages) {
            warn!(
                tokens = current,
                available = self.available_tokens,
                "Minimal projection still exceeds the budget; returning as-is"
            );
            return messages.to_vec();
        }

        let reduced = self.importance_aware(messages);
        let reduced_tokens = self.counter.count(&reduced);
        if reduced_tokens <= self.available_tokens {
            debug!(
                kept = reduced.len(),
                dropped = messages.len() - reduced.len(),
                tokens = reduced_tokens,
                "Context reduced with importance-aware selection"
            );
            return reduced;
        }

        self.minimal_guarantee(messages)
    }

    /// Sliding-window projection: initial task + marker + last N messages.
    /// A cruder layer than `reduce`, kept for callers that want a fixed
    /// shape regardless of token cost.
    pub fn sliding_window(&self, messages: &[Message], window_size: usize) -> Vec<Message> {
        if messages.len() <= window_size {
            return messages.to_vec();
        }
        let removed = messages.len() - window_size - 1;
        let mut result = vec![messages[0].clone(), Message::compression_marker(removed)];
        result.extend_from_slice(&messages[messages.len() - window_size..]);
        result
    }

    /// Step 2: retain first + important middle + recent tail, with a marker
    /// for whatever was dropped.
    fn importance_aware(&self, messages: &[Message]) -> Vec<Message> {
        let len = messages.len();
        let tail_start = len.saturating_sub(self.config.keep_recent).max(1);

        let mut important = Vec::new();
        let mut dropped = 0usize;
        for message in &messages[1..tail_start] {
            if self.is_important(message) {
                important.push(message.clone());
            } else {
                dropped += 1;
            }
        }

        let mut result = Vec::with_capacity(2 + important.len() + (len - tail_start));
        result.push(messages[0].clone());
        if dropped > 0 {
            result.push(Message::compression_marker(dropped));
        }
        result.extend(important);
        result.extend_from_slice(&messages[tail_start..]);
        result
    }

    /// Step 3: initial task + marker + last K, unconditionally boundable.
    /// Discards "important" messages when even they do not fit.
    fn minimal_guarantee(&self, messages: &[Message]) -> Vec<Message> {
        let len = messages.len();
        if len <= self.config.minimal_tail + 1 {
            // Nothing structural left to drop; the single-message
            // pathological case lands here. Configuration problem, not ours.
            warn!(
                messages = len,
                available = self.available_tokens,
                "Conversation too small to trim further but still over budget"
            );
            return messages.to_vec();
        }

        let tail_start = len - self.config.minimal_tail;
        let removed = tail_start - 1;
        let mut result = vec![messages[0].clone(), Message::compression_marker(removed)];
        result.extend_from_slice(&messages[tail_start..]);

        let tokens = self.counter.count(&result);
        if tokens > self.available_tokens {
            warn!(
                tokens,
                available = self.available_tokens,
                "Minimal guarantee exceeds the budget; caller should revisit reserves"
            );
        }
        debug!(kept = result.len(), removed, "Context reduced to minimal guarantee");
        result
    }

    fn is_important(&self, message: &Message) -> bool {
        if message.role == Role::Tool {
            return true;
        }
        message.tool_calls.iter().any(|tc| {
            self.config
                .high_value_tools
                .iter()
                .any(|name| name == &tc.name)
        })
    }

    /// Shape produced by `minimal_guarantee`: [first, marker, short tail].
    fn is_minimal_shape(&self, messages: &[Message]) -> bool {
        messages.len() <= self.config.minimal_tail + 2
            && messages.get(1).is_some_and(Message::is_compression_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepclaw_core::MessageToolCall;

    fn manager(max_tokens: usize, reserve: usize) -> ContextWindowManager {
        ContextWindowManager::new(ContextWindowConfig {
            max_tokens,
            system_prompt_reserve: reserve,
            response_reserve: reserve,
            ..ContextWindowConfig::default()
        })
        .unwrap()
    }

    fn filler(words: usize) -> String {
        std::iter::repeat("research")
            .take(words)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn construction_rejects_exhausted_budget() {
        let result = ContextWindowManager::new(ContextWindowConfig {
            max_tokens: 1000,
            system_prompt_reserve: 600,
            response_reserve: 400,
            ..ContextWindowConfig::default()
        });
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn fast_path_returns_conversation_unchanged() {
        // budget=1000, reserves=200+200 (available=600); a small
        // conversation passes through untouched.
        let mgr = manager(1000, 200);
        assert_eq!(mgr.available_tokens(), 600);

        let messages = vec![
            Message::user("Task: compare async runtimes"),
            Message::assistant(filler(100)),
            Message::tool_result("call_1", filler(100)),
        ];
        assert!(mgr.count(&messages) <= 600);

        let reduced = mgr.reduce(&messages);
        assert_eq!(reduced.len(), messages.len());
        for (a, b) in reduced.iter().zip(&messages) {
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn oversized_conversation_is_compressed_with_marker() {
        // 40 messages well over the 600-token ceiling come back as
        // initial task + marker + recent tail, within budget.
        let mgr = manager(1000, 200);

        let mut messages = vec![Message::user("Task: survey Rust web frameworks")];
        for i in 0..39 {
            messages.push(Message::assistant(format!("step {i}: {}", filler(40))));
        }
        assert!(mgr.count(&messages) > mgr.available_tokens());

        let reduced = mgr.reduce(&messages);
        assert!(mgr.count(&reduced) <= mgr.available_tokens());
        assert_eq!(reduced[0].content, messages[0].content);
        assert!(reduced[1].is_compression_marker());
        // Tail preserved verbatim, most recent last.
        assert_eq!(
            reduced.last().unwrap().content,
            messages.last().unwrap().content
        );
    }

    #[test]
    fn reduce_never_increases_size() {
        let mgr = manager(1000, 200);
        let mut messages = vec![Message::user("Task")];
        for i in 0..30 {
            messages.push(Message::assistant(format!("{i} {}", filler(60))));
        }
        let reduced = mgr.reduce(&messages);
        assert!(reduced.len() <= messages.len());
        assert!(mgr.count(&reduced) <= mgr.count(&messages));
    }

    #[test]
    fn reduce_is_idempotent_on_its_own_output() {
        let mgr = manager(1000, 200);
        let mut messages = vec![Message::user("Task: deep dive")];
        for i in 0..40 {
            messages.push(Message::assistant(format!("{i} {}", filler(50))));
        }

        let once = mgr.reduce(&messages);
        let twice = mgr.reduce(&once);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.content, b.content);
        }
    }

    #[test]
    fn important_middle_messages_survive_when_they_fit() {
        let mgr = manager(4000, 500);

        let mut messages = vec![Message::user("Task: gather sources")];
        // Noise that should be dropped.
        for i in 0..10 {
            messages.push(Message::assistant(format!("musing {i} {}", filler(200))));
        }
        // A high-value tool call in the middle.
        messages.push(Message::assistant_with_tool_calls(
            "",
            vec![MessageToolCall::new("web_search", r#"{"query":"sources"}"#)],
        ));
        for i in 0..10 {
            messages.push(Message::assistant(format!("more musing {i} {}", filler(200))));
        }
        // Recent tail.
        for i in 0..8 {
            messages.push(Message::assistant(format!("recent {i}")));
        }

        assert!(mgr.count(&messages) > mgr.available_tokens());
        let reduced = mgr.reduce(&messages);
        assert!(
            reduced
                .iter()
                .any(|m| m.tool_calls.iter().any(|tc| tc.name == "web_search")),
            "high-value tool call should be retained"
        );
        assert!(reduced.iter().any(Message::is_compression_marker));
    }

    #[test]
    fn recency_outranks_importance_in_fallback() {
        // Force the minimal guarantee: even important messages are bulky.
        let mgr = manager(800, 250);

        let mut messages = vec![Message::user("Task")];
        for _ in 0..20 {
            messages.push(Message::tool_result("call", filler(80)));
        }
        for i in 0..6 {
            messages.push(Message::assistant(format!("tail {i}")));
        }

        let reduced = mgr.reduce(&messages);
        // Minimal shape: first + marker + last K, importance discarded.
        assert_eq!(reduced.len(), mgr.config.minimal_tail + 2);
        assert!(reduced[1].is_compression_marker());
        assert_eq!(reduced.last().unwrap().content, "tail 5");
    }

    #[test]
    fn sliding_window_keeps_first_and_tail() {
        let mgr = manager(1000, 200);
        let messages: Vec<_> = (0..20)
            .map(|i| Message::assistant(format!("m{i}")))
            .collect();

        let windowed = mgr.sliding_window(&messages, 5);
        assert_eq!(windowed.len(), 7);
        assert_eq!(windowed[0].content, "m0");
        assert!(windowed[1].is_compression_marker());
        assert_eq!(windowed.last().unwrap().content, "m19");
    }
}
