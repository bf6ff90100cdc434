//! Completed image command handlers
//!
//! Handles listing, viewing, favoriting and deleting images the poller has
//! stored.

use anyhow::{Result, anyhow};
use clap::Subcommand;
use colored::*;
use horde_core::domain::image::CompletedImage;
use horde_store::LocalJobStore;

use crate::config::Config;
use crate::id_resolver::{Scope, resolve_job_id};

/// Image subcommands
#[derive(Subcommand)]
pub enum ImageCommands {
    /// List completed images, newest first
    List {
        /// Only show favorites
        #[arg(short, long)]
        favorites: bool,
    },
    /// Get image details
    Get {
        /// Job ID, unambiguous prefix, or local number as listed (e.g. #12)
        id: String,
    },
    /// Mark an image as favorite
    Favorite {
        /// Job ID or unambiguous prefix
        id: String,

        /// Remove the mark instead
        #[arg(long)]
        unset: bool,
    },
    /// Delete an image and any pending record of its job
    Delete {
        /// Job ID or unambiguous prefix
        id: String,
    },
}

/// Handle image commands
///
/// # Arguments
/// * `command` - The image command to execute
/// * `config` - The CLI configuration
pub fn handle_image_command(command: ImageCommands, config: &Config) -> Result<()> {
    let store = config.open_store()?;

    match command {
        ImageCommands::List { favorites } => list_images(&store, favorites),
        ImageCommands::Get { id } => get_image(&store, &id),
        ImageCommands::Favorite { id, unset } => favorite_image(&store, &id, !unset),
        ImageCommands::Delete { id } => delete_image(&store, &id),
    }
}

fn list_images(store: &LocalJobStore, favorites: bool) -> Result<()> {
    let images = store.list_completed(favorites)?;

    if images.is_empty() {
        let message = if favorites {
            "No favorite images."
        } else {
            "No completed images."
        };
        println!("{}", message.yellow());
    } else {
        println!("{}", format!("Found {} image(s):", images.len()).bold());
        println!();
        for image in images {
            print_image_summary(&image);
        }
    }

    Ok(())
}

fn get_image(store: &LocalJobStore, id: &str) -> Result<()> {
    let image = find_image(store, id)?;
    print_image_details(&image);
    Ok(())
}

/// Looks an image up by `#<local id>` or by job id
fn find_image(store: &LocalJobStore, id: &str) -> Result<CompletedImage> {
    if let Some(number) = id.trim().strip_prefix('#') {
        let local_id: i64 = number
            .parse()
            .map_err(|_| anyhow!("Invalid image number '{}'", id))?;
        return store
            .get_completed_by_id(local_id)?
            .ok_or_else(|| anyhow!("Image #{} not found", local_id));
    }

    let job_id = resolve_job_id(store, id, Scope::Completed)?;
    store
        .get_completed(&job_id)?
        .ok_or_else(|| anyhow!("Image for job {} not found", job_id))
}

fn favorite_image(store: &LocalJobStore, id: &str, favorited: bool) -> Result<()> {
    let job_id = resolve_job_id(store, id, Scope::Completed)?;
    if !store.set_favorite(&job_id, favorited)? {
        return Err(anyhow!("Image for job {} not found", job_id));
    }

    if favorited {
        println!("{}", format!("★ Job {} marked as favorite", job_id).green());
    } else {
        println!("{}", format!("Job {} unmarked", job_id).green());
    }

    Ok(())
}

/// Removes every local trace of a job
///
/// Both sets are cleared so a result still in flight is discarded by the
/// poller instead of resurrecting the image.
fn delete_image(store: &LocalJobStore, id: &str) -> Result<()> {
    let job_id = resolve_job_id(store, id, Scope::Any)?;

    let pending = store.delete_pending(&job_id)?;
    let completed = store.delete_completed(&job_id)?;
    if !pending && !completed {
        return Err(anyhow!("Job {} not found", job_id));
    }

    println!("{}", format!("✓ Job {} deleted", job_id).green());

    Ok(())
}

fn print_image_summary(image: &CompletedImage) {
    let star = if image.favorited {
        "★".yellow()
    } else {
        "▸".cyan()
    };
    println!("  {} #{} Job {}", star, image.id, image.job_id.bold());
    if let Some(prompt) = prompt_of(image) {
        println!("    Prompt:    {}", prompt.dimmed());
    }
    println!(
        "    Completed: {}",
        image
            .completed_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

fn print_image_details(image: &CompletedImage) {
    println!("{}", "Image Details:".bold());
    println!("  ID:        {}", image.id);
    println!("  Job ID:    {}", image.job_id.cyan());
    println!("  Favorite:  {}", if image.favorited { "yes" } else { "no" });
    if let Some(prompt) = prompt_of(image) {
        println!("  Prompt:    {}", prompt);
    }
    if let Some(model) = &image.model {
        println!("  Model:     {}", model);
    }
    if let Some(seed) = &image.seed {
        println!("  Seed:      {}", seed);
    }
    match (&image.worker_name, &image.worker_id) {
        (Some(name), Some(id)) => println!("  Worker:    {} ({})", name, id.dimmed()),
        (Some(name), None) => println!("  Worker:    {}", name),
        (None, Some(id)) => println!("  Worker:    {}", id),
        (None, None) => {}
    }
    if let Some(link) = &image.shortlink {
        println!("  Shortlink: {}", link);
    }
    println!(
        "  Submitted: {}",
        image.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Completed: {}",
        image.completed_at.format("%Y-%m-%d %H:%M:%S")
    );

    println!("\n{}", "Image:".bold());
    if image.image.starts_with("http://") || image.image.starts_with("https://") {
        println!("  {}", image.image);
    } else {
        println!("  {}", format!("<{} bytes of base64 data>", image.image.len()).dimmed());
    }
}

fn prompt_of(image: &CompletedImage) -> Option<&str> {
    image.params.get("prompt").and_then(|p| p.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use horde_core::domain::image::NewCompletedImage;
    use horde_core::domain::job::PendingJob;
    use serde_json::json;

    fn store_with_image(job_id: &str) -> (LocalJobStore, i64) {
        let store = LocalJobStore::open_in_memory().unwrap();
        store
            .insert_pending(&PendingJob::new(job_id, json!({"prompt": "a cat"})))
            .unwrap();
        let outcome = store
            .promote_to_completed(
                job_id,
                &NewCompletedImage {
                    image: "UklGRg==".to_string(),
                    seed: None,
                    model: None,
                    worker_id: None,
                    worker_name: None,
                    completed_at: Utc::now(),
                },
            )
            .unwrap();
        match outcome {
            horde_store::PromoteOutcome::Promoted { id } => (store, id),
            other => panic!("expected promotion, got {:?}", other),
        }
    }

    #[test]
    fn test_find_image_by_local_number() {
        let (store, id) = store_with_image("abc123");
        let image = find_image(&store, &format!("#{}", id)).unwrap();
        assert_eq!(image.job_id, "abc123");
        assert_eq!(prompt_of(&image), Some("a cat"));

        assert!(find_image(&store, "#999").is_err());
        assert!(find_image(&store, "#abc").is_err());
    }

    #[test]
    fn test_find_image_by_job_prefix() {
        let (store, _) = store_with_image("abc123");
        assert_eq!(find_image(&store, "abc").unwrap().job_id, "abc123");
    }

    #[test]
    fn test_delete_removes_image() {
        let (store, _) = store_with_image("abc123");
        delete_image(&store, "abc123").unwrap();
        assert!(store.get_completed("abc123").unwrap().is_none());
        assert!(delete_image(&store, "abc123").is_err());
    }
}
