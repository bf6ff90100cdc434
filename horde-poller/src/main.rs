//! Horde Poller
//!
//! Background process that keeps the local job store in sync with Horde.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Repositories: HTTP communication with Horde (status checks, results, heartbeat)
//! - Services: Observable state (image notices, Horde availability)
//! - Scheduler: Poll loop over pending jobs and the heartbeat task
//!
//! Every tick the poller checks each pending job, records progress, promotes
//! finished images into the completed set and raises a notice for them.

mod config;
mod repository;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::{HttpStatusRepository, StatusRepository};
use crate::scheduler::{PollConfig, PollLoop, spawn_heartbeat};
use crate::service::{HordeHealth, NoticeKind, NotificationState};
use horde_client::HordeClient;
use horde_store::LocalJobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "horde_poller=info,horde_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Horde Poller");

    let config = Config::from_env();
    config.validate()?;
    info!(
        "Loaded configuration: api_url={}, db_path={}",
        config.api_url,
        config.db_path.display()
    );

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let client = HordeClient::with_client(&config.api_url, &config.client_agent, http);

    let store = Arc::new(
        LocalJobStore::open(&config.db_path)
            .with_context(|| format!("Failed to open job store at {}", config.db_path.display()))?,
    );
    info!("Job store opened");

    let status: Arc<dyn StatusRepository> = Arc::new(HttpStatusRepository::new(client));
    let notifications = Arc::new(NotificationState::new());
    let health = Arc::new(HordeHealth::new());

    let heartbeat = spawn_heartbeat(
        Arc::clone(&status),
        Arc::clone(&health),
        config.heartbeat_interval,
    );
    let notices = spawn_notice_logger(Arc::clone(&notifications));

    info!(
        "Poll interval: {:?}, heartbeat interval: {:?}, max parallel checks: {}",
        config.poll_interval, config.heartbeat_interval, config.max_parallel_checks
    );

    let poller = PollLoop::new(PollConfig::from(&config), status, store, notifications)
        .with_health(health)
        .start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown requested");
    poller.stop().await;
    heartbeat.abort();
    notices.abort();

    Ok(())
}

/// Logs each notice and acknowledges it so the next one can surface
fn spawn_notice_logger(notifications: Arc<NotificationState>) -> tokio::task::JoinHandle<()> {
    let mut rx = notifications.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let Some(notice) = notifications.current() else {
                continue;
            };
            match notice.kind {
                NoticeKind::Ready => info!("Image ready for job {}", notice.job_id),
                NoticeKind::Failed => warn!("Generation failed for job {}", notice.job_id),
            }
            notifications.acknowledge();
        }
    })
}
