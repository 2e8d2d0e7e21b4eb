use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "chatsync",
    about = "Chat transcript sync engine (scripted replay front end)"
)]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Replay a JSON fixture against a sync session and print the result
    Replay {
        /// Fixture file with chats, history and steps
        fixture: PathBuf,
    },
}
