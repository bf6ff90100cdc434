//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod check;
mod image;
mod pending;
mod submit;

pub use image::ImageCommands;
pub use pending::PendingCommands;
pub use submit::SubmitArgs;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use horde_core::domain::job::JobStatus;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a generation request and track it locally
    Submit(SubmitArgs),
    /// Check the status of a job once, straight from Horde
    Check {
        /// Job ID
        job_id: String,
    },
    /// Pending job management
    Pending {
        #[command(subcommand)]
        command: PendingCommands,
    },
    /// Completed image management
    Image {
        #[command(subcommand)]
        command: ImageCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Submit(args) => submit::handle_submit(args, config).await,
        Commands::Check { job_id } => check::handle_check(&job_id, config).await,
        Commands::Pending { command } => pending::handle_pending_command(command, config),
        Commands::Image { command } => image::handle_image_command(command, config),
    }
}

/// Colorize job status for display
pub(crate) fn colorize_status(status: &JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Waiting => status_str.yellow(),
        JobStatus::Processing => status_str.cyan(),
        JobStatus::Done => status_str.green(),
        JobStatus::Faulted | JobStatus::NotFound => status_str.red(),
        JobStatus::UnknownError => status_str.dimmed(),
    }
}
