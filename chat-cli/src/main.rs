//! # peerchat
//!
//! Command-line front end for peerchat.
//!
//! ## Commands
//!
//! - `demo`: Two in-process peers exchange a greeting
//! - `chat`: Interactive session against in-process echo peers
//! - `history`: Print a stored conversation
//!
//! ## Example
//!
//! ```bash
//! # Run the alice/bob scenario
//! peerchat demo
//!
//! # Chat as alice with two echo peers
//! peerchat chat --name alice --peer bob --peer carol
//!
//! # Show what alice and bob said
//! peerchat history --name alice --with bob
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{chat, demo, history};
use config::Config;

/// Command-line front end for peerchat.
#[derive(Parser, Debug)]
#[command(name = "peerchat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "peerchat.toml")]
    config: PathBuf,

    /// Data directory for history files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the alice/bob scenario and print the resulting history
    Demo,

    /// Chat interactively with in-process echo peers
    Chat {
        /// Our identity (falls back to [session] identity)
        #[arg(long, short)]
        name: Option<String>,

        /// Echo peers to spawn
        #[arg(long = "peer", short)]
        peers: Vec<String>,
    },

    /// Print the stored conversation with a peer
    History {
        /// Whose history file to read (falls back to [session] identity)
        #[arg(long, short)]
        name: Option<String>,

        /// The other participant
        #[arg(long, short)]
        with: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    match cli.command {
        Commands::Demo => {
            demo::run(&data_dir, &config).await?;
        }
        Commands::Chat { name, peers } => {
            let identity = require_identity(&config, name.as_deref())?;
            chat::run(&data_dir, &config, &identity, &peers).await?;
        }
        Commands::History { name, with } => {
            let identity = require_identity(&config, name.as_deref())?;
            history::run(&data_dir, &config, &identity, &with).await?;
        }
    }

    Ok(())
}

/// Log to stderr so command output on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn require_identity(config: &Config, name: Option<&str>) -> Result<String> {
    config
        .identity(name)
        .context("No identity: pass --name or set [session] identity in the config file")
}

/// Get the default data directory for peerchat.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "peerchat", "peerchat")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
