//! Horde CLI
//!
//! Command-line interface for submitting generations to Horde and managing
//! the local job store shared with the poller.

mod commands;
mod config;
mod id_resolver;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use horde_client::ANONYMOUS_API_KEY;

#[derive(Parser)]
#[command(name = "horde")]
#[command(about = "Horde image generation CLI", long_about = None)]
struct Cli {
    /// Horde API URL
    #[arg(long, env = "HORDE_API_URL", default_value = "https://stablehorde.net")]
    api_url: String,

    /// Client agent sent with every request (name:version:contact)
    #[arg(long, env = "HORDE_CLIENT_AGENT", default_value = concat!("horde-cli:", env!("CARGO_PKG_VERSION"), ":unknown"))]
    client_agent: String,

    /// API key used for submissions
    #[arg(long, env = "HORDE_API_KEY", default_value = ANONYMOUS_API_KEY, hide_env_values = true)]
    api_key: String,

    /// Path of the local job store
    #[arg(long, env = "HORDE_DB_PATH", default_value = "horde.db")]
    db_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        api_url: cli.api_url,
        client_agent: cli.client_agent,
        api_key: cli.api_key,
        db_path: cli.db_path.into(),
    };

    handle_command(cli.command, &config).await
}
