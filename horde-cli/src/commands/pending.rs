//! Pending job command handlers

use anyhow::{Result, bail};
use clap::Subcommand;
use colored::*;
use horde_core::domain::job::PendingJob;

use super::colorize_status;
use crate::config::Config;
use crate::id_resolver::{Scope, resolve_job_id};

/// Pending subcommands
#[derive(Subcommand)]
pub enum PendingCommands {
    /// List jobs still waiting for a result
    List,
    /// Stop tracking a job; a result arriving later is discarded
    Delete {
        /// Job ID or unambiguous prefix
        id: String,
    },
}

/// Handle pending commands
pub fn handle_pending_command(command: PendingCommands, config: &Config) -> Result<()> {
    let store = config.open_store()?;

    match command {
        PendingCommands::List => {
            let jobs = store.list_pending()?;
            if jobs.is_empty() {
                println!("{}", "No pending jobs.".yellow());
            } else {
                println!("{}", format!("Found {} pending job(s):", jobs.len()).bold());
                println!();
                for job in jobs {
                    print_pending(&job);
                }
            }
            Ok(())
        }
        PendingCommands::Delete { id } => {
            let job_id = resolve_job_id(&store, &id, Scope::Pending)?;
            if !store.delete_pending(&job_id)? {
                bail!("Job {} is no longer pending", job_id);
            }
            println!("{}", format!("✓ Job {} deleted", job_id).green());
            Ok(())
        }
    }
}

fn print_pending(job: &PendingJob) {
    println!("  {} Job {}", "▸".cyan(), job.job_id.bold());
    println!("    Status:    {}", colorize_status(&job.status));
    if let Some(position) = job.queue_position {
        println!("    Queue:     {}", position);
    }
    if let Some(wait) = job.wait_time {
        println!("    Wait time: {}s", wait);
    }
    if let Some(prompt) = job.params.get("prompt").and_then(|p| p.as_str()) {
        println!("    Prompt:    {}", prompt.dimmed());
    }
    println!(
        "    Submitted: {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}
