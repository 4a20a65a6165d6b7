//! `baton check` — validate a config file.

use std::path::PathBuf;

use baton_config::AppConfig;

pub fn run(config_path: PathBuf) -> anyhow::Result<()> {
    let config = AppConfig::load(&config_path)?;

    println!("✓ {} is valid", config_path.display());
    println!("  provider:   {}", config.default_provider);
    println!("  agents:     {}", config.agents.len());
    println!("  guardrails: {}", config.guardrails.len());
    println!("  max turns:  {}", config.runner.max_turns);
    if !config.agents.is_empty() {
        println!("  entry:      {}", config.entry_agent()?.name);
    }

    Ok(())
}
