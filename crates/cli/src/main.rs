//! DeepClaw CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Initialize config directory and default config
//! - `research` — Run a bounded research task in the terminal
//! - `chat`     — Open-ended research session (ends on "stop")
//! - `serve`    — Start the HTTP gateway

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "deepclaw",
    about = "DeepClaw — long-lived tool-calling research agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and workspace directories
    Onboard,

    /// Run a research task to completion, streaming output
    Research {
        /// The research task
        task: String,
    },

    /// Start an open-ended research conversation (type "stop" to end)
    Chat {
        /// The opening message
        task: String,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run()?,
        Commands::Research { task } => commands::research::run(task, false).await?,
        Commands::Chat { task } => commands::research::run(task, true).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
    }

    Ok(())
}
