//! Research tool implementations.
//!
//! Tools are a **closed set of tagged variants**: one [`ToolCommand`]
//! variant per capability, dispatched by exhaustive match. There is no
//! open-ended registry — the reasoning engine can only request tools this
//! enum can parse, and the compiler checks that every variant is handled.
//!
//! A tool receives read access to the agent's research context plus a
//! [`ToolEnv`] describing where it may touch the world, and reports back a
//! [`ToolEffect`]: plain output, a clarification pause, or a completion
//! request. Failures are `ToolError`s; the execution loop records them into
//! the conversation and keeps going.

pub mod files;
pub mod report;
pub mod search;

use deepclaw_config::SearchConfig;
use deepclaw_core::error::ToolError;
use deepclaw_core::provider::ToolDefinition;
use deepclaw_core::state::ResearchContext;
use deepclaw_core::tool::ToolEffect;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment handed to tool invocations: sandbox roots, limits, and the
/// shared HTTP client.
#[derive(Clone)]
pub struct ToolEnv {
    /// Root directory for the agent's file memory. All file tool paths are
    /// resolved inside it.
    pub memory_root: PathBuf,

    /// Directory where reports are persisted.
    pub reports_dir: PathBuf,

    /// Web search backend configuration.
    pub search: SearchConfig,

    /// Shared HTTP client for network-bound tools.
    pub http: reqwest::Client,

    /// Per-file size ceiling for `create_file`.
    pub file_size_limit: u64,

    /// Total memory-root size ceiling.
    pub memory_size_limit: u64,
}

impl ToolEnv {
    pub fn new(memory_root: PathBuf, reports_dir: PathBuf, search: SearchConfig) -> Self {
        Self {
            memory_root,
            reports_dir,
            search,
            http: reqwest::Client::new(),
            file_size_limit: 1024 * 1024,
            memory_size_limit: 64 * 1024 * 1024,
        }
    }
}

// --- Argument payloads ---
//
// Every tool takes a short `reasoning` field so the trace of *why* the
// engine chose an action survives in the conversation log.

#[derive(Debug, Clone, Deserialize)]
pub struct ClarificationArgs {
    #[serde(default)]
    pub reasoning: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSearchArgs {
    #[serde(default)]
    pub reasoning: String,
    pub query: String,
    #[serde(default)]
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReportArgs {
    #[serde(default)]
    pub reasoning: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalAnswerArgs {
    #[serde(default)]
    pub reasoning: String,
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFileArgs {
    #[serde(default)]
    pub reasoning: String,
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadFileArgs {
    #[serde(default)]
    pub reasoning: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetSizeArgs {
    #[serde(default)]
    pub reasoning: String,
    /// Empty string means the whole memory root.
    #[serde(default)]
    pub file_or_dir_path: String,
}

/// The closed set of agent capabilities.
#[derive(Debug, Clone)]
pub enum ToolCommand {
    Clarification(ClarificationArgs),
    WebSearch(WebSearchArgs),
    CreateReport(CreateReportArgs),
    FinalAnswer(FinalAnswerArgs),
    CreateFile(CreateFileArgs),
    ReadFile(ReadFileArgs),
    GetSize(GetSizeArgs),
}

impl ToolCommand {
    /// Resolve a (name, JSON arguments) decision into a concrete command.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        let invalid = |reason: serde_json::Error| ToolError::InvalidArguments {
            tool_name: name.to_string(),
            reason: reason.to_string(),
        };
        match name {
            "clarification" => Ok(Self::Clarification(
                serde_json::from_str(arguments).map_err(invalid)?,
            )),
            "web_search" => Ok(Self::WebSearch(
                serde_json::from_str(arguments).map_err(invalid)?,
            )),
            "create_report" => Ok(Self::CreateReport(
                serde_json::from_str(arguments).map_err(invalid)?,
            )),
            "final_answer" => Ok(Self::FinalAnswer(
                serde_json::from_str(arguments).map_err(invalid)?,
            )),
            "create_file" => Ok(Self::CreateFile(
                serde_json::from_str(arguments).map_err(invalid)?,
            )),
            "read_file" => Ok(Self::ReadFile(
                serde_json::from_str(arguments).map_err(invalid)?,
            )),
            "get_size" => Ok(Self::GetSize(
                serde_json::from_str(arguments).map_err(invalid)?,
            )),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// The wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clarification(_) => "clarification",
            Self::WebSearch(_) => "web_search",
            Self::CreateReport(_) => "create_report",
            Self::FinalAnswer(_) => "final_answer",
            Self::CreateFile(_) => "create_file",
            Self::ReadFile(_) => "read_file",
            Self::GetSize(_) => "get_size",
        }
    }

    /// The reasoning text the engine supplied with this command.
    pub fn reasoning(&self) -> &str {
        match self {
            Self::Clarification(a) => &a.reasoning,
            Self::WebSearch(a) => &a.reasoning,
            Self::CreateReport(a) => &a.reasoning,
            Self::FinalAnswer(a) => &a.reasoning,
            Self::CreateFile(a) => &a.reasoning,
            Self::ReadFile(a) => &a.reasoning,
            Self::GetSize(a) => &a.reasoning,
        }
    }

    /// Execute the command. The context is read-only; effects on agent
    /// state are requested through the returned [`ToolEffect`].
    pub async fn invoke(
        &self,
        ctx: &ResearchContext,
        env: &ToolEnv,
    ) -> Result<ToolEffect, ToolError> {
        match self {
            Self::Clarification(args) => Ok(ToolEffect::AwaitClarification {
                questions: args.questions.join("\n"),
            }),
            Self::WebSearch(args) => search::run(args, env).await,
            Self::CreateReport(args) => report::create_report(args, ctx, env),
            Self::FinalAnswer(args) => Ok(ToolEffect::Complete {
                answer: args.answer.clone(),
            }),
            Self::CreateFile(args) => files::create_file(args, env),
            Self::ReadFile(args) => files::read_file(args, env),
            Self::GetSize(args) => files::get_size(args, env),
        }
    }
}

fn reasoning_property() -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": "Why this action is needed (1-2 sentences max)"
    })
}

/// Tool schemas sent to the reasoning engine.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "clarification".into(),
            description: "Pause research and ask the user clarifying questions".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "reasoning": reasoning_property(),
                    "questions": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Questions for the user"
                    }
                },
                "required": ["questions"]
            }),
        },
        ToolDefinition {
            name: "web_search".into(),
            description: "Search the web and collect sources".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "reasoning": reasoning_property(),
                    "query": { "type": "string", "description": "The search query" },
                    "max_results": { "type": "integer", "description": "Result count override" }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "create_report".into(),
            description: "Write a structured research report and persist it".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "reasoning": reasoning_property(),
                    "title": { "type": "string" },
                    "content": { "type": "string", "description": "Markdown report body" }
                },
                "required": ["title", "content"]
            }),
        },
        ToolDefinition {
            name: "final_answer".into(),
            description: "Deliver the final answer to the task".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "reasoning": reasoning_property(),
                    "answer": { "type": "string" }
                },
                "required": ["answer"]
            }),
        },
        ToolDefinition {
            name: "create_file".into(),
            description: "Create a file in the agent's memory directory".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "reasoning": reasoning_property(),
                    "file_path": { "type": "string", "description": "Path relative to the memory root" },
                    "content": { "type": "string" }
                },
                "required": ["file_path", "content"]
            }),
        },
        ToolDefinition {
            name: "read_file".into(),
            description: "Read a file from the agent's memory directory".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "reasoning": reasoning_property(),
                    "file_path": { "type": "string", "description": "Path relative to the memory root" }
                },
                "required": ["file_path"]
            }),
        },
        ToolDefinition {
            name: "get_size".into(),
            description: "Get the size of a memory file or directory (empty path = whole memory)".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "reasoning": reasoning_property(),
                    "file_or_dir_path": { "type": "string" }
                }
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolves_every_known_tool() {
        let cases = [
            ("clarification", r#"{"questions":["Which decade?"]}"#),
            ("web_search", r#"{"query":"rust"}"#),
            ("create_report", r#"{"title":"T","content":"C"}"#),
            ("final_answer", r#"{"answer":"42"}"#),
            ("create_file", r#"{"file_path":"a.txt","content":"x"}"#),
            ("read_file", r#"{"file_path":"a.txt"}"#),
            ("get_size", r#"{}"#),
        ];
        for (name, args) in cases {
            let cmd = ToolCommand::parse(name, args).unwrap();
            assert_eq!(cmd.name(), name);
        }
    }

    #[test]
    fn parse_rejects_unknown_tool() {
        let err = ToolCommand::parse("launch_missiles", "{}").unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }

    #[test]
    fn parse_rejects_malformed_arguments() {
        let err = ToolCommand::parse("web_search", r#"{"no_query":true}"#).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn definitions_cover_all_variants() {
        let defs = definitions();
        assert_eq!(defs.len(), 7);
        for def in &defs {
            // Every schema parses back into a command name.
            assert!(
                ToolCommand::parse(&def.name, "{}").is_ok()
                    || matches!(
                        ToolCommand::parse(&def.name, "{}"),
                        Err(ToolError::InvalidArguments { .. })
                    )
            );
        }
    }

    #[tokio::test]
    async fn final_answer_requests_completion() {
        let env = ToolEnv::new(
            std::env::temp_dir(),
            std::env::temp_dir(),
            SearchConfig::default(),
        );
        let ctx = ResearchContext::new();
        let cmd = ToolCommand::parse("final_answer", r#"{"answer":"Done."}"#).unwrap();
        match cmd.invoke(&ctx, &env).await.unwrap() {
            ToolEffect::Complete { answer } => assert_eq!(answer, "Done."),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn clarification_requests_pause() {
        let env = ToolEnv::new(
            std::env::temp_dir(),
            std::env::temp_dir(),
            SearchConfig::default(),
        );
        let ctx = ResearchContext::new();
        let cmd = ToolCommand::parse(
            "clarification",
            r#"{"questions":["Which year?","Which region?"]}"#,
        )
        .unwrap();
        match cmd.invoke(&ctx, &env).await.unwrap() {
            ToolEffect::AwaitClarification { questions } => {
                assert!(questions.contains("Which year?"));
                assert!(questions.contains("Which region?"));
            }
            other => panic!("expected AwaitClarification, got {other:?}"),
        }
    }
}
