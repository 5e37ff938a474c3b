//! CLI subcommand definitions and handlers.
//!
//! - `start` (default) -- run the classroom server
//! - `config show|path` -- inspect configuration
//! - `version` -- print build/version info

use crate::config::{self, Config};
use clap::{Parser, Subcommand};

/// Real-time classroom polling server.
#[derive(Parser, Debug)]
#[command(
    name = "pollroom",
    version = env!("CARGO_PKG_VERSION"),
    about = "Live classroom polls, answers and chat over WebSocket"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the server (default when no subcommand is given).
    Start {
        /// Port to listen on (overrides config).
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (overrides config).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

impl Default for Command {
    fn default() -> Self {
        Command::Start {
            port: None,
            bind: None,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

/// Apply `start` flags on top of the loaded config.
pub fn apply_start_overrides(config: &mut Config, port: Option<u16>, bind: Option<String>) {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
}

/// Run the `config show` subcommand.
pub fn handle_config_show() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    println!("{}", serde_json::to_string_pretty(&cfg)?);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("pollroom {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("POLLROOM_BUILD_DATE"));
    println!("  Git commit: {}", env!("POLLROOM_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}
