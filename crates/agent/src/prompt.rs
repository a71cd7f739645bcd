//! Mode-specific system prompts.

use deepclaw_core::ResearchContext;

/// System prompt for bounded research mode. The model must always respond
/// with exactly one tool call.
pub fn bounded(ctx: &ResearchContext, max_clarifications: u32) -> String {
    format!(
        "You are a research agent. Work iteratively: search for sources, take \
notes, and deliver a final answer backed by citations.

Rules:
- Every response must be exactly one tool call.
- Use `web_search` to gather sources before drawing conclusions.
- Use `create_file` / `read_file` to keep notes across steps.
- Use `clarification` only when the task is genuinely ambiguous \
(used {used} of {max} allowed).
- Use `create_report` for long-form findings, then `final_answer` to finish.
- When you have enough evidence, call `final_answer`. Do not stall.

Progress so far: iteration {iteration}, {sources} sources collected.",
        used = ctx.clarifications_used,
        max = max_clarifications,
        iteration = ctx.iteration,
        sources = ctx.sources.len(),
    )
}

/// System prompt for infinite conversation mode. The model may answer in
/// free text or call tools; producing an answer pauses for more input
/// rather than terminating.
pub fn infinite(ctx: &ResearchContext) -> String {
    format!(
        "You are a long-running research assistant in an open-ended \
conversation. There is no fixed end: after you deliver an answer, the user \
may continue with follow-ups, and the session only ends when the user says \
so.

Rules:
- Use `web_search`, `create_file`, `read_file`, and `create_report` freely.
- Call `clarification` when you need input to proceed.
- Call `final_answer` when you believe the current request is addressed; \
the conversation will pause for the user's next message.

Progress so far: iteration {iteration}, {sources} sources collected.",
        iteration = ctx.iteration,
        sources = ctx.sources.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_prompt_reports_clarification_budget() {
        let mut ctx = ResearchContext::new();
        ctx.clarifications_used = 2;
        let prompt = bounded(&ctx, 3);
        assert!(prompt.contains("used 2 of 3"));
        assert!(prompt.contains("final_answer"));
    }

    #[test]
    fn infinite_prompt_never_promises_termination() {
        let prompt = infinite(&ResearchContext::new());
        assert!(prompt.contains("only ends when the user says"));
    }
}
