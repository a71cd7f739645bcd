//! `deepclaw research` / `deepclaw chat` — run an agent in the terminal.
//!
//! Output chunks stream to stdout as the loop produces them. When the
//! agent pauses for input, the command reads a line from stdin and hands it
//! back — as a clarification for bounded research, or as a continuation
//! (including the "stop" phrase) for a chat session.

use deepclaw_agent::{AgentMode, AgentRuntime};
use deepclaw_config::AppConfig;
use deepclaw_core::AgentState;
use std::io::Write;
use std::time::Duration;

pub async fn run(task: String, infinite: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    let provider = deepclaw_providers::build_from_config(&config)?;
    let runtime = AgentRuntime::new(provider, config);

    let mode = if infinite {
        AgentMode::Infinite
    } else {
        AgentMode::Bounded
    };
    let (id, stream) = runtime.create_agent(task, mode)?;
    println!("Agent {id} started\n");

    let printer = tokio::spawn(async move {
        while let Some(chunk) = stream.next_chunk().await {
            print!("{chunk}");
            let _ = std::io::stdout().flush();
        }
    });

    loop {
        let snapshot = runtime.get_status(&id)?;
        if snapshot.state.is_terminal() {
            break;
        }

        if snapshot.state == AgentState::WaitingForClarification {
            // Let pending question chunks land before prompting.
            tokio::time::sleep(Duration::from_millis(100)).await;
            let line = read_line().await?;
            if infinite {
                runtime.continue_conversation(&id, line)?;
            } else {
                runtime.submit_clarification(&id, line)?;
            }
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    printer.await?;
    let snapshot = runtime.get_status(&id)?;
    println!(
        "\nAgent {id} finished: {} ({} iterations, {} sources)",
        snapshot.state,
        snapshot.iteration,
        snapshot.sources.len()
    );
    Ok(())
}

async fn read_line() -> Result<String, Box<dyn std::error::Error>> {
    let line = tokio::task::spawn_blocking(|| {
        print!("> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await??;
    Ok(line.trim().to_string())
}
