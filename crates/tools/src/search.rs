//! Web search over a Tavily-compatible HTTP API.
//!
//! Results become both formatted text for the conversation and structured
//! [`Source`] records the agent accumulates for citations.

use crate::{ToolEnv, WebSearchArgs};
use deepclaw_core::error::ToolError;
use deepclaw_core::state::Source;
use deepclaw_core::tool::ToolEffect;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
    include_answer: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

pub async fn run(args: &WebSearchArgs, env: &ToolEnv) -> Result<ToolEffect, ToolError> {
    let api_key = env
        .search
        .api_key
        .as_deref()
        .ok_or_else(|| ToolError::ExecutionFailed {
            tool_name: "web_search".into(),
            reason: "search is not configured — set TAVILY_API_KEY".into(),
        })?;

    let max_results = args
        .max_results
        .unwrap_or(env.search.max_results)
        .clamp(1, 20);

    debug!(query = %args.query, max_results, "Running web search");

    let response = env
        .http
        .post(&env.search.api_url)
        .json(&SearchRequest {
            api_key,
            query: &args.query,
            max_results,
            include_answer: true,
        })
        .send()
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "web_search".into(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        warn!(status = status.as_u16(), "Search backend returned an error");
        return Err(ToolError::ExecutionFailed {
            tool_name: "web_search".into(),
            reason: format!("search backend returned HTTP {}", status.as_u16()),
        });
    }

    let parsed: SearchResponse =
        response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "web_search".into(),
                reason: format!("malformed search response: {e}"),
            })?;

    let sources: Vec<Source> = parsed
        .results
        .iter()
        .map(|hit| Source {
            title: if hit.title.is_empty() {
                hit.url.clone()
            } else {
                hit.title.clone()
            },
            url: hit.url.clone(),
            snippet: if hit.content.is_empty() {
                None
            } else {
                Some(truncate(&hit.content, 500))
            },
        })
        .collect();

    Ok(ToolEffect::Output {
        content: format_results(&args.query, parsed.answer.as_deref(), &sources),
        sources,
    })
}

fn format_results(query: &str, answer: Option<&str>, sources: &[Source]) -> String {
    let mut out = format!("Search results for: {query}\n");
    if let Some(answer) = answer {
        out.push_str(&format!("\nSummary: {answer}\n"));
    }
    if sources.is_empty() {
        out.push_str("\nNo results found.\n");
        return out;
    }
    for (i, source) in sources.iter().enumerate() {
        out.push_str(&format!("\n{}. {} — {}\n", i + 1, source.title, source.url));
        if let Some(snippet) = &source.snippet {
            out.push_str(&format!("   {snippet}\n"));
        }
    }
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_numbers_results_with_snippets() {
        let sources = vec![
            Source {
                title: "BPE explained".into(),
                url: "https://example.com/bpe".into(),
                snippet: Some("Greedy merges.".into()),
            },
            Source {
                title: "Tokenizer survey".into(),
                url: "https://example.com/survey".into(),
                snippet: None,
            },
        ];
        let text = format_results("bpe", Some("Byte pair encoding"), &sources);
        assert!(text.contains("Summary: Byte pair encoding"));
        assert!(text.contains("1. BPE explained"));
        assert!(text.contains("2. Tokenizer survey"));
        assert!(text.contains("Greedy merges."));
    }

    #[test]
    fn format_reports_empty_results() {
        let text = format_results("obscure query", None, &[]);
        assert!(text.contains("No results found"));
    }

    #[test]
    fn truncate_preserves_short_text() {
        assert_eq!(truncate("short", 100), "short");
        let long = "x".repeat(600);
        let cut = truncate(&long, 500);
        assert_eq!(cut.chars().count(), 501);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn response_parsing_tolerates_missing_fields() {
        let json = r#"{"results":[{"url":"https://a.example"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.answer.is_none());
        assert_eq!(parsed.results[0].url, "https://a.example");
        assert!(parsed.results[0].title.is_empty());
    }

    #[tokio::test]
    async fn unconfigured_search_fails_cleanly() {
        let env = ToolEnv::new(
            std::env::temp_dir(),
            std::env::temp_dir(),
            deepclaw_config::SearchConfig::default(),
        );
        let args = WebSearchArgs {
            reasoning: String::new(),
            query: "anything".into(),
            max_results: None,
        };
        let err = run(&args, &env).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
