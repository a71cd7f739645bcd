//! Report generation.
//!
//! `create_report` persists a markdown report (with a sources appendix
//! drawn from the research context) to the reports directory and returns
//! the full report text as the tool output, so it both survives on disk
//! and flows back through the conversation and the output stream.

use crate::{CreateReportArgs, ToolEnv};
use chrono::Utc;
use deepclaw_core::error::ToolError;
use deepclaw_core::state::ResearchContext;
use deepclaw_core::tool::ToolEffect;
use std::fs;
use tracing::info;

pub fn create_report(
    args: &CreateReportArgs,
    ctx: &ResearchContext,
    env: &ToolEnv,
) -> Result<ToolEffect, ToolError> {
    let mut body = format!("# {}\n\n{}\n", args.title, args.content.trim_end());

    if !ctx.sources.is_empty() {
        body.push_str("\n## Sources\n\n");
        for (i, source) in ctx.sources.iter().enumerate() {
            body.push_str(&format!("{}. [{}]({})\n", i + 1, source.title, source.url));
        }
    }

    fs::create_dir_all(&env.reports_dir).map_err(|e| ToolError::ExecutionFailed {
        tool_name: "create_report".into(),
        reason: e.to_string(),
    })?;

    let filename = format!(
        "{}_{}.md",
        Utc::now().format("%Y%m%d_%H%M%S"),
        slugify(&args.title)
    );
    let path = env.reports_dir.join(&filename);
    fs::write(&path, &body).map_err(|e| ToolError::ExecutionFailed {
        tool_name: "create_report".into(),
        reason: e.to_string(),
    })?;

    info!(report = %filename, sources = ctx.sources.len(), "Saved research report");
    Ok(ToolEffect::output(body))
}

/// Reduce a title to a filesystem-safe slug.
fn slugify(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let trimmed: String = slug.trim_matches('_').chars().take(60).collect();
    if trimmed.is_empty() {
        "report".into()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepclaw_config::SearchConfig;
    use deepclaw_core::state::Source;
    use tempfile::TempDir;

    fn env_in(dir: &TempDir) -> ToolEnv {
        ToolEnv::new(
            dir.path().join("memory"),
            dir.path().join("reports"),
            SearchConfig::default(),
        )
    }

    #[test]
    fn report_is_persisted_and_returned() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir);
        let mut ctx = ResearchContext::new();
        ctx.record_sources(vec![Source {
            title: "BPE paper".into(),
            url: "https://example.com/bpe".into(),
            snippet: None,
        }]);

        let args = CreateReportArgs {
            reasoning: String::new(),
            title: "Tokenization Findings".into(),
            content: "BPE merges greedily.".into(),
        };
        let effect = create_report(&args, &ctx, &env).unwrap();

        assert!(effect.content().starts_with("# Tokenization Findings"));
        assert!(effect.content().contains("## Sources"));
        assert!(effect.content().contains("https://example.com/bpe"));

        let saved: Vec<_> = fs::read_dir(dir.path().join("reports"))
            .unwrap()
            .collect();
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn report_without_sources_skips_appendix() {
        let dir = TempDir::new().unwrap();
        let env = env_in(&dir);
        let ctx = ResearchContext::new();

        let args = CreateReportArgs {
            reasoning: String::new(),
            title: "Quick note".into(),
            content: "Nothing external cited.".into(),
        };
        let effect = create_report(&args, &ctx, &env).unwrap();
        assert!(!effect.content().contains("## Sources"));
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Hello, World!"), "hello__world");
        assert_eq!(slugify("???"), "report");
    }
}
