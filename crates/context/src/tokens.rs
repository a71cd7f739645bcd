//! Token cost estimation for role-tagged conversations.

use deepclaw_core::Message;
use tiktoken_rs::{cl100k_base, get_bpe_from_model, CoreBPE};
use tracing::debug;

/// Fixed per-message overhead modelling role framing cost.
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Estimates the token cost of a conversation for a given model.
///
/// Deterministic and monotonic: appending any non-empty message strictly
/// increases the count (every message costs at least its role overhead).
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    /// Build a counter for a model name. Unknown models fall back to the
    /// `cl100k_base` encoding rather than failing.
    pub fn for_model(model: &str) -> Self {
        let bpe = match get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(_) => {
                debug!(model, "No tokenizer for model, falling back to cl100k_base");
                cl100k_base().expect("cl100k_base encoding is bundled")
            }
        };
        Self { bpe }
    }

    /// Token count of a single text.
    pub fn count_text(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Token count of a message list: per-message role overhead, content,
    /// and any tool-call name + argument payloads.
    pub fn count(&self, messages: &[Message]) -> usize {
        let mut total = 0;
        for message in messages {
            total += MESSAGE_OVERHEAD_TOKENS;

            if !message.content.is_empty() {
                total += self.count_text(&message.content);
            }

            for tool_call in &message.tool_calls {
                total += self.count_text(&format!("{}{}", tool_call.name, tool_call.arguments));
            }
        }
        total
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::for_model("gpt-4")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepclaw_core::MessageToolCall;

    #[test]
    fn empty_conversation_costs_nothing() {
        let counter = TokenCounter::default();
        assert_eq!(counter.count(&[]), 0);
    }

    #[test]
    fn every_message_carries_role_overhead() {
        let counter = TokenCounter::default();
        let messages = vec![Message::user("")];
        // Empty content still pays the framing cost.
        assert_eq!(counter.count(&messages), MESSAGE_OVERHEAD_TOKENS);
    }

    #[test]
    fn appending_increases_count_strictly() {
        let counter = TokenCounter::default();
        let mut messages = vec![Message::user("What is the airspeed of a laden swallow?")];
        let before = counter.count(&messages);

        messages.push(Message::assistant("African or European?"));
        let after = counter.count(&messages);
        assert!(after > before);
    }

    #[test]
    fn tool_call_payloads_are_counted() {
        let counter = TokenCounter::default();
        let bare = vec![Message::assistant("")];
        let with_call = vec![Message::assistant_with_tool_calls(
            "",
            vec![MessageToolCall::new(
                "web_search",
                r#"{"query":"rust async runtimes comparison"}"#,
            )],
        )];
        assert!(counter.count(&with_call) > counter.count(&bare));
    }

    #[test]
    fn unknown_model_falls_back() {
        let counter = TokenCounter::for_model("some-future-model-v99");
        assert!(counter.count_text("hello world") > 0);
    }

    #[test]
    fn count_is_deterministic() {
        let counter = TokenCounter::default();
        let messages = vec![
            Message::user("Research the history of the Rust language."),
            Message::assistant("Starting with the 2010 announcement..."),
        ];
        assert_eq!(counter.count(&messages), counter.count(&messages));
    }
}
