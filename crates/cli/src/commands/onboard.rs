//! `deepclaw onboard` — create the config directory, a default config
//! file, and the artifact directories.

use deepclaw_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    std::fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("Wrote default config to {}", config_path.display());
    }

    let config = AppConfig::load()?;
    for dir in [
        config.paths.memory_dir(),
        config.paths.reports_dir(),
        config.paths.logs_dir(),
    ] {
        std::fs::create_dir_all(&dir)?;
    }

    println!("Workspace ready under {}", config_dir.display());
    if config.api_key.is_none() {
        println!("Note: no API key configured. Set DEEPCLAW_API_KEY or edit config.toml.");
    }
    Ok(())
}
