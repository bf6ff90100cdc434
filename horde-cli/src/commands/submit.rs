//! Submit command handler
//!
//! Sends a generation request to Horde and records the accepted job in the
//! local pending set, where the poller picks it up.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use horde_core::domain::job::PendingJob;
use horde_core::dto::generate::{GenerationParams, GenerationRequest};

use crate::config::Config;

/// Arguments of `horde submit`
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Text prompt
    #[arg(short, long)]
    prompt: String,

    /// Model to request (any available model if omitted)
    #[arg(short, long)]
    model: Option<String>,

    /// Image width in pixels, a multiple of 64
    #[arg(long, default_value = "512")]
    width: u32,

    /// Image height in pixels, a multiple of 64
    #[arg(long, default_value = "512")]
    height: u32,

    /// Sampling steps
    #[arg(long, default_value = "25")]
    steps: u32,

    /// Fixed seed (random if omitted)
    #[arg(long)]
    seed: Option<String>,

    /// Allow NSFW results
    #[arg(long)]
    nsfw: bool,
}

const MAX_DIMENSION: u32 = 3072;
const MAX_STEPS: u32 = 500;

impl SubmitArgs {
    /// Builds the request body, rejecting values Horde would refuse
    fn to_request(&self) -> Result<GenerationRequest> {
        if self.prompt.trim().is_empty() {
            bail!("Prompt cannot be empty");
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value == 0 || value % 64 != 0 || value > MAX_DIMENSION {
                bail!(
                    "{} must be a multiple of 64 between 64 and {}",
                    name,
                    MAX_DIMENSION
                );
            }
        }
        if self.steps == 0 || self.steps > MAX_STEPS {
            bail!("steps must be between 1 and {}", MAX_STEPS);
        }

        Ok(GenerationRequest {
            prompt: self.prompt.trim().to_string(),
            params: GenerationParams {
                steps: self.steps,
                width: self.width,
                height: self.height,
                seed: self.seed.clone(),
                ..GenerationParams::default()
            },
            models: self.model.iter().cloned().collect(),
            nsfw: self.nsfw,
            censor_nsfw: !self.nsfw,
            r2: true,
        })
    }
}

/// Submit a generation and start tracking it
pub async fn handle_submit(args: SubmitArgs, config: &Config) -> Result<()> {
    let request = args.to_request()?;
    let store = config.open_store()?;
    let client = config.client()?;

    let submitted = client
        .submit_generation(&request)
        .await
        .context("Failed to submit generation")?;

    let params = serde_json::to_value(&request).context("Failed to serialize request")?;
    store
        .insert_pending(&PendingJob::new(&submitted.id, params))
        .context("Failed to record pending job")?;

    println!("{}", "✓ Generation submitted".green());
    println!("  Job ID: {}", submitted.id.cyan());
    if let Some(kudos) = submitted.kudos {
        println!("  Kudos:  {}", kudos);
    }
    if let Some(message) = &submitted.message {
        println!("  {}", message.dimmed());
    }

    Ok(())
}
