use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "helix",
    about = "Demo participant/spectator processes for a Helix-style cluster",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Join the cluster as a participant running the demo master/slave state
    /// model, and stay connected until interrupted.
    Participant {
        /// Path to a participant config YAML file.
        config: PathBuf,
    },

    /// Watch a resource's external view and print its partition states.
    Spectate {
        /// Path to a participant config YAML file (reused for the cluster id
        /// and coordination addresses).
        config: PathBuf,

        /// Resource to watch.
        resource: String,
    },
}
