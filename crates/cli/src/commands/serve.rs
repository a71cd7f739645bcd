//! `deepclaw serve` — run the HTTP gateway.

use deepclaw_agent::AgentRuntime;
use deepclaw_config::AppConfig;
use std::sync::Arc;

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    let provider = deepclaw_providers::build_from_config(&config)?;
    let host = config.gateway.host.clone();
    let port = port.unwrap_or(config.gateway.port);

    let runtime = Arc::new(AgentRuntime::new(provider, config));
    deepclaw_gateway::serve(runtime, &host, port).await?;
    Ok(())
}
