//! `baton run` — execute one run against the configured agent graph.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use baton_config::AppConfig;
use baton_runner::RunEvent;

use crate::runtime::assemble;

pub async fn run(
    config_path: PathBuf,
    message: String,
    agent: Option<String>,
    stream: bool,
) -> anyhow::Result<()> {
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("could not load {}", config_path.display()))?;
    let runtime = assemble(&config)?;

    let entry = match agent {
        Some(name) => runtime
            .agents
            .get(&name)
            .cloned()
            .with_context(|| format!("agent '{name}' is not configured"))?,
        None => Arc::clone(&runtime.entry),
    };

    if stream {
        run_streamed(&runtime.runner, entry, message).await
    } else {
        run_blocking(&runtime.runner, entry, message).await
    }
}

async fn run_blocking(
    runner: &baton_runner::Runner,
    entry: Arc<baton_core::AgentDefinition>,
    message: String,
) -> anyhow::Result<()> {
    match runner.run(entry, message).await {
        Ok(result) => {
            println!("{}", result.output_text());
            eprintln!(
                "── {} turn(s), agent '{}', {} tokens",
                result.turns, result.last_agent, result.usage.total_tokens
            );
            Ok(())
        }
        Err(failure) => {
            eprintln!(
                "run failed after {} turn(s): {}",
                failure.state.turn(),
                failure.error
            );
            std::process::exit(1);
        }
    }
}

async fn run_streamed(
    runner: &baton_runner::Runner,
    entry: Arc<baton_core::AgentDefinition>,
    message: String,
) -> anyhow::Result<()> {
    let mut streamed = runner.run_streamed(entry, message);

    while let Some(event) = streamed.events.recv().await {
        match event {
            RunEvent::PartialText { delta } => {
                print!("{delta}");
                std::io::stdout().flush().ok();
            }
            RunEvent::ToolCallStarted { name, .. } => {
                eprintln!("⚙ {name} …");
            }
            RunEvent::ToolCallFinished { name, success, .. } => {
                eprintln!("⚙ {name} {}", if success { "done" } else { "failed" });
            }
            RunEvent::HandoffOccurred { from, to } => {
                eprintln!("→ hand-off: {from} → {to}");
            }
            RunEvent::GuardrailTripped { guardrail, reason, .. } => {
                eprintln!("✋ guardrail '{guardrail}': {reason}");
            }
            RunEvent::RunCompleted { turns, usage, .. } => {
                println!();
                eprintln!("── {turns} turn(s), {} tokens", usage.total_tokens);
            }
            RunEvent::RunFailed { error } => {
                eprintln!("run failed: {error}");
            }
        }
    }

    match streamed.handle.await? {
        Ok(_) => Ok(()),
        Err(_) => std::process::exit(1),
    }
}
