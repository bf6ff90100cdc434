//! Check command handler
//!
//! Performs a single status check against Horde. Nothing is written to the
//! local store; the poller owns that.

use anyhow::Result;
use colored::*;
use horde_client::CheckResponse;

use crate::config::Config;
use crate::id_resolver::{Scope, resolve_job_id};

/// Check a job once and print the answer
///
/// Prefixes of locally pending jobs are expanded; anything else is sent as is.
pub async fn handle_check(input: &str, config: &Config) -> Result<()> {
    let job_id = config
        .open_store()
        .and_then(|store| resolve_job_id(&store, input, Scope::Pending))
        .unwrap_or_else(|_| input.trim().to_string());

    let response = config.client()?.check_image_status(&job_id).await;
    print_check(&response);

    Ok(())
}

fn print_check(response: &CheckResponse) {
    println!("{}", format!("Job {}:", response.job_id()).bold());

    match response {
        CheckResponse::Status { check, .. } => {
            let status = if check.faulted {
                "FAULTED".red()
            } else if check.done {
                "DONE".green()
            } else {
                check.implied_status().as_str().cyan()
            };
            println!("  Status:         {}", status);
            println!("  Queue position: {}", check.queue_position);
            println!("  Wait time:      {}s", check.wait_time);
            println!(
                "  Images:         {} finished, {} processing, {} waiting",
                check.finished, check.processing, check.waiting
            );
            if let Some(kudos) = check.kudos {
                println!("  Kudos:          {}", kudos);
            }
            if check.is_possible == Some(false) {
                println!(
                    "  {}",
                    "⚠ No worker can currently serve this request".yellow()
                );
            }
        }
        CheckResponse::NotFound { .. } => {
            println!("  {}", "Horde does not know this job".red());
        }
        CheckResponse::WaitingForPendingRequest { .. } => {
            println!("  {}", "Rate limited, try again shortly".yellow());
        }
        CheckResponse::UnknownError { .. } => {
            println!("  {}", "Could not reach Horde".yellow());
        }
    }
}
