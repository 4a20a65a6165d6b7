//! `baton agents` — list configured agents and their hand-off graph.

use std::path::PathBuf;

use baton_config::AppConfig;

pub fn run(config_path: PathBuf) -> anyhow::Result<()> {
    let config = AppConfig::load(&config_path)?;

    if config.agents.is_empty() {
        println!("No agents configured in {}", config_path.display());
        return Ok(());
    }

    let entry = config.entry_agent()?.name.clone();

    for agent in &config.agents {
        let marker = if agent.name == entry { " (entry)" } else { "" };
        println!("{}{marker}", agent.name);
        if !agent.description.is_empty() {
            println!("  {}", agent.description);
        }
        if !agent.tools.is_empty() {
            println!("  tools:    {}", agent.tools.join(", "));
        }
        if !agent.handoffs.is_empty() {
            println!("  handoffs: {}", agent.handoffs.join(", "));
        }
        if agent.output_schema.is_some() {
            println!("  output:   structured (schema)");
        }
    }

    Ok(())
}
