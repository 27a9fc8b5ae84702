mod cli;
mod commands;
mod dummy_statemodel;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Participant { config } => commands::run_participant(&config).await,
        Command::Spectate { config, resource } => commands::run_spectate(&config, &resource).await,
    }
}
