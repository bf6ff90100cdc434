//! Job status poll loop
//!
//! Periodically checks every non-terminal pending job against Horde and
//! merges the answers into the local store. Each job is checked in its own
//! task; a job never has more than one check in flight.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use horde_client::{CheckPayload, CheckResponse};
use horde_core::domain::image::NewCompletedImage;
use horde_core::domain::job::{JobStatus, PendingUpdate};
use horde_store::{LocalJobStore, PromoteOutcome, UpdateOutcome};
use parking_lot::Mutex;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::repository::StatusRepository;
use crate::service::{HordeHealth, ImageNotice, NotificationState};

/// Poll loop settings
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Max status checks in flight across all jobs
    pub max_parallel_checks: usize,
}

impl From<&Config> for PollConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.poll_interval,
            max_parallel_checks: config.max_parallel_checks,
        }
    }
}

/// What a single status check did to the local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Horde is rate limiting checks; nothing changed
    Backoff,
    /// Transient failure; nothing changed, the job is checked again next tick
    Retained,
    /// Status or queue hints were updated
    Progress,
    /// The answer regressed the stored status and was dropped
    Stale,
    /// The job was promoted to the completed set
    Completed,
    /// Another check already promoted the job
    AlreadyCompleted,
    /// Horde reported the generation as failed
    Faulted,
    /// Horde no longer knows the job; it was removed from the pending set
    NotFound,
    /// The job was deleted locally while the check was in flight
    Discarded,
}

/// State shared by the loop and its per-job tasks
struct PollContext {
    status: Arc<dyn StatusRepository>,
    store: Arc<LocalJobStore>,
    notifications: Arc<NotificationState>,
    in_flight: Mutex<HashSet<String>>,
    semaphore: Semaphore,
}

/// Marks a job as having a check in flight until dropped
struct InFlightGuard {
    ctx: Arc<PollContext>,
    job_id: String,
}

impl InFlightGuard {
    /// Returns `None` if the job already has a check in flight
    fn acquire(ctx: &Arc<PollContext>, job_id: &str) -> Option<Self> {
        if !ctx.in_flight.lock().insert(job_id.to_string()) {
            return None;
        }
        Some(Self {
            ctx: Arc::clone(ctx),
            job_id: job_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ctx.in_flight.lock().remove(&self.job_id);
    }
}

/// Checks dispatched by one tick
pub struct TickHandle {
    handles: Vec<JoinHandle<(String, PollOutcome)>>,
    skipped_in_flight: usize,
}

impl TickHandle {
    /// Number of checks started by this tick
    pub fn dispatched(&self) -> usize {
        self.handles.len()
    }

    /// Number of jobs skipped because a previous check was still outstanding
    pub fn skipped_in_flight(&self) -> usize {
        self.skipped_in_flight
    }

    /// Waits for every dispatched check and returns its outcome
    #[cfg(test)]
    pub async fn join(self) -> Vec<(String, PollOutcome)> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("Status check task panicked: {}", e),
            }
        }
        outcomes
    }
}

/// Running poll loop
pub struct PollHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl PollHandle {
    /// Stops ticking and waits for the loop to exit
    ///
    /// Checks already dispatched finish on their own.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            warn!("Poll loop task ended abnormally: {}", e);
        }
    }
}

/// Coordinator polling Horde for every pending job
pub struct PollLoop {
    config: PollConfig,
    ctx: Arc<PollContext>,
    health: Option<Arc<HordeHealth>>,
}

impl PollLoop {
    /// Creates a new poll loop
    pub fn new(
        config: PollConfig,
        status: Arc<dyn StatusRepository>,
        store: Arc<LocalJobStore>,
        notifications: Arc<NotificationState>,
    ) -> Self {
        let semaphore = Semaphore::new(config.max_parallel_checks);
        Self {
            config,
            ctx: Arc::new(PollContext {
                status,
                store,
                notifications,
                in_flight: Mutex::new(HashSet::new()),
                semaphore,
            }),
            health: None,
        }
    }

    /// Skips ticks while `health` reports Horde as offline
    pub fn with_health(mut self, health: Arc<HordeHealth>) -> Self {
        self.health = Some(health);
        self
    }

    /// Starts ticking in a background task
    pub fn start(self) -> PollHandle {
        let (shutdown, rx) = watch::channel(false);
        let join = tokio::spawn(async move { self.run(rx).await });
        PollHandle { shutdown, join }
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting poll loop (interval: {:?})", self.config.interval);

        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.health.as_ref().is_some_and(|h| !h.is_online()) {
                        debug!("Horde offline, skipping poll cycle");
                        continue;
                    }
                    match self.tick() {
                        Ok(tick) => {
                            if tick.dispatched() > 0 || tick.skipped_in_flight() > 0 {
                                debug!(
                                    "Dispatched {} status check(s), {} still in flight",
                                    tick.dispatched(),
                                    tick.skipped_in_flight()
                                );
                            }
                        }
                        Err(e) => error!("Error during poll cycle: {:#}", e),
                    }
                }
                _ = shutdown.changed() => {
                    info!("Poll loop stopped");
                    return;
                }
            }
        }
    }

    /// Dispatches one round of status checks
    ///
    /// Jobs in a terminal state and jobs whose previous check is still
    /// outstanding are skipped. The checks run detached; await the returned
    /// handle to observe their outcomes.
    pub fn tick(&self) -> Result<TickHandle> {
        let jobs = self
            .ctx
            .store
            .list_pending()
            .context("Failed to list pending jobs")?;

        let mut handles = Vec::new();
        let mut skipped_in_flight = 0;

        for job in jobs {
            if job.status.is_terminal() {
                continue;
            }

            let Some(guard) = InFlightGuard::acquire(&self.ctx, &job.job_id) else {
                debug!("Check for job {} still in flight, skipping", job.job_id);
                skipped_in_flight += 1;
                continue;
            };

            let ctx = Arc::clone(&self.ctx);
            handles.push(tokio::spawn(async move {
                let outcome = ctx.poll_job(&guard.job_id).await;
                let job_id = guard.job_id.clone();
                drop(guard);
                (job_id, outcome)
            }));
        }

        Ok(TickHandle {
            handles,
            skipped_in_flight,
        })
    }
}

impl PollContext {
    /// Checks one job and applies the answer
    async fn poll_job(&self, job_id: &str) -> PollOutcome {
        let Ok(_permit) = self.semaphore.acquire().await else {
            return PollOutcome::Retained;
        };

        let response = self.status.check_status(job_id).await;

        match self.apply(job_id, response).await {
            Ok(outcome) => {
                debug!("Job {}: {:?}", job_id, outcome);
                outcome
            }
            Err(e) => {
                warn!("Failed to apply status of job {}: {:#}", job_id, e);
                PollOutcome::Retained
            }
        }
    }

    async fn apply(&self, job_id: &str, response: CheckResponse) -> Result<PollOutcome> {
        match response {
            CheckResponse::WaitingForPendingRequest { .. } => {
                debug!("Status checks rate limited, backing off job {}", job_id);
                Ok(PollOutcome::Backoff)
            }
            CheckResponse::UnknownError { .. } => {
                debug!("Transient error checking job {}, retrying next tick", job_id);
                Ok(PollOutcome::Retained)
            }
            CheckResponse::NotFound { .. } => self.apply_not_found(job_id),
            CheckResponse::Status { check, .. } => {
                if check.faulted {
                    self.apply_faulted(job_id)
                } else if check.done {
                    self.apply_done(job_id).await
                } else {
                    self.apply_progress(job_id, &check)
                }
            }
        }
    }

    fn apply_not_found(&self, job_id: &str) -> Result<PollOutcome> {
        let Some(current) = self.store.get_pending(job_id)? else {
            return Ok(PollOutcome::Discarded);
        };
        if !self.store.delete_pending(job_id)? {
            return Ok(PollOutcome::Discarded);
        }

        // Only jobs that were seen alive on Horde surface a failure
        if current.observed {
            warn!("Job {} was dropped by Horde", job_id);
            self.notify(ImageNotice::failed(job_id));
        } else {
            info!("Job {} is unknown to Horde, removed", job_id);
        }
        Ok(PollOutcome::NotFound)
    }

    fn apply_faulted(&self, job_id: &str) -> Result<PollOutcome> {
        let update = PendingUpdate {
            status: JobStatus::Faulted,
            queue_position: None,
            wait_time: None,
            observed: true,
        };

        Ok(match self.store.update_pending(job_id, &update)? {
            UpdateOutcome::Applied => {
                warn!("Job {} faulted on Horde", job_id);
                self.notify(ImageNotice::failed(job_id));
                PollOutcome::Faulted
            }
            UpdateOutcome::Stale => PollOutcome::Stale,
            UpdateOutcome::Missing => PollOutcome::Discarded,
        })
    }

    fn apply_progress(&self, job_id: &str, check: &CheckPayload) -> Result<PollOutcome> {
        let update = PendingUpdate {
            status: check.implied_status(),
            queue_position: Some(check.queue_position),
            wait_time: Some(check.wait_time),
            observed: true,
        };

        Ok(match self.store.update_pending(job_id, &update)? {
            UpdateOutcome::Applied => PollOutcome::Progress,
            UpdateOutcome::Stale => PollOutcome::Stale,
            UpdateOutcome::Missing => PollOutcome::Discarded,
        })
    }

    async fn apply_done(&self, job_id: &str) -> Result<PollOutcome> {
        if self.store.get_pending(job_id)?.is_none() {
            return Ok(PollOutcome::Discarded);
        }

        let result = match self.status.fetch_result(job_id).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{:#}", e);
                return Ok(PollOutcome::Retained);
            }
        };

        if result.faulted {
            return self.apply_faulted(job_id);
        }
        // The check and the result endpoint can disagree briefly
        let generation = match result.generations.into_iter().next() {
            Some(generation) if result.done => generation,
            _ => {
                debug!("Result of job {} not ready yet, retrying next tick", job_id);
                return Ok(PollOutcome::Retained);
            }
        };

        let image = match self.resolve_image(generation.img).await {
            Ok(image) => image,
            Err(e) => {
                warn!("Job {}: {:#}", job_id, e);
                return Ok(PollOutcome::Retained);
            }
        };

        let record = NewCompletedImage {
            image,
            seed: generation.seed,
            model: generation.model,
            worker_id: generation.worker_id,
            worker_name: generation.worker_name,
            completed_at: Utc::now(),
        };

        Ok(match self.store.promote_to_completed(job_id, &record)? {
            PromoteOutcome::Promoted { .. } => {
                self.notify(ImageNotice::ready(job_id));
                PollOutcome::Completed
            }
            PromoteOutcome::AlreadyCompleted => PollOutcome::AlreadyCompleted,
            PromoteOutcome::NotPending => PollOutcome::Discarded,
        })
    }

    /// Returns the image as base64, downloading it if Horde sent a link
    async fn resolve_image(&self, img: String) -> Result<String> {
        if !img.starts_with("http://") && !img.starts_with("https://") {
            return Ok(img);
        }
        let bytes = self.status.download_image(&img).await?;
        Ok(BASE64.encode(bytes))
    }

    fn notify(&self, notice: ImageNotice) {
        let job_id = notice.job_id.clone();
        if !self.notifications.publish(notice) {
            debug!("Notice for job {} suppressed, one is already pending", job_id);
        }
    }
}
