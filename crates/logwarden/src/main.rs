//! Logwarden - parse system auth and apt history logs into a deduplicated
//! event database, and report on the stored events.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

use logwarden::commands;
use logwarden_common::config::{Config, CONFIG_PATH};

#[derive(Parser)]
#[command(name = "logwarden")]
#[command(about = "Parse, store and view security and package events from system logs", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse logfiles and save events to the database
    Parse,

    /// Show events from the database
    Show {
        /// Only show events at or after this date, e.g. "2016-04-07"
        #[arg(short = 'd', long)]
        since: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Parse => commands::parse(&config),
        Commands::Show { since } => commands::show(&config, since),
    }
}
