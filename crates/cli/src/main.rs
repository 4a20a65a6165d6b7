//! baton CLI — the main entry point.
//!
//! Commands:
//! - `run`    — run an input against the configured agent graph
//! - `agents` — list configured agents and their hand-off graph
//! - `check`  — validate a config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "baton",
    about = "baton — multi-agent orchestration runtime",
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
    /// Run an input against the configured agent graph
    Run {
        /// Path to the config file
        #[arg(short, long, default_value = "baton.toml")]
        config: PathBuf,

        /// The user input
        message: String,

        /// Start with this agent instead of the configured entry agent
        #[arg(short, long)]
        agent: Option<String>,

        /// Stream events as the run progresses
        #[arg(short, long)]
        stream: bool,
    },

    /// List configured agents and their hand-off graph
    Agents {
        /// Path to the config file
        #[arg(short, long, default_value = "baton.toml")]
        config: PathBuf,
    },

    /// Validate a config file
    Check {
        /// Path to the config file
        #[arg(short, long, default_value = "baton.toml")]
        config: PathBuf,
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
        Commands::Run { config, message, agent, stream } => {
            commands::run::run(config, message, agent, stream).await?
        }
        Commands::Agents { config } => commands::agents::run(config)?,
        Commands::Check { config } => commands::check::run(config)?,
    }

    Ok(())
}
