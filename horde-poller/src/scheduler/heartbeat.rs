//! Horde heartbeat task

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

use crate::repository::StatusRepository;
use crate::service::HordeHealth;

/// Starts a background task that keeps `health` in sync with Horde's heartbeat
pub fn spawn_heartbeat(
    status: Arc<dyn StatusRepository>,
    health: Arc<HordeHealth>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);

        loop {
            ticker.tick().await;

            debug!("Sending heartbeat");

            let online = match status.heartbeat().await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Heartbeat failed: {:#}", e);
                    false
                }
            };

            if health.set_online(online) {
                if online {
                    info!("Horde API is back online");
                } else {
                    warn!("Horde API appears to be offline");
                }
            }
        }
    })
}
