//! Scripted status repository for tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use horde_client::{CheckPayload, CheckResponse};
use horde_core::dto::generate::{Generation, GenerationStatus};
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::StatusRepository;

/// Answers status checks from a per-job script and counts calls
#[derive(Default)]
pub struct ScriptedStatusRepository {
    responses: Mutex<HashMap<String, CheckResponse>>,
    results: Mutex<HashMap<String, GenerationStatus>>,
    images: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<HashMap<String, usize>>,
    gate: Option<Arc<Notify>>,
    offline: AtomicBool,
}

impl ScriptedStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds every status check until the returned `Notify` is signalled
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let repo = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (repo, gate)
    }

    pub fn respond(&self, response: CheckResponse) {
        self.responses
            .lock()
            .insert(response.job_id().to_string(), response);
    }

    pub fn respond_with(&self, job_id: &str, check: CheckPayload) {
        self.respond(CheckResponse::Status {
            job_id: job_id.to_string(),
            check,
        });
    }

    /// Scripts a done check plus a single-image result
    pub fn finish(&self, job_id: &str) {
        self.respond_with(
            job_id,
            CheckPayload {
                done: true,
                finished: 1,
                ..Default::default()
            },
        );
        self.results.lock().insert(
            job_id.to_string(),
            GenerationStatus {
                done: true,
                faulted: false,
                generations: vec![Generation {
                    img: format!("img-{}", job_id),
                    seed: Some("42".to_string()),
                    model: Some("stable_diffusion".to_string()),
                    worker_id: Some("w-1".to_string()),
                    worker_name: Some("Worker One".to_string()),
                    censored: false,
                }],
            },
        );
    }

    /// Scripts the `generate/status` answer for a job
    pub fn set_result(&self, job_id: &str, result: GenerationStatus) {
        self.results.lock().insert(job_id.to_string(), result);
    }

    /// Serves `bytes` at `url`; unknown links fail to download
    pub fn serve_image(&self, url: &str, bytes: &[u8]) {
        self.images.lock().insert(url.to_string(), bytes.to_vec());
    }

    pub fn clear_result(&self, job_id: &str) {
        self.results.lock().remove(job_id);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self, job_id: &str) -> usize {
        self.calls.lock().get(job_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl StatusRepository for ScriptedStatusRepository {
    async fn check_status(&self, job_id: &str) -> CheckResponse {
        *self.calls.lock().entry(job_id.to_string()).or_default() += 1;

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.responses
            .lock()
            .get(job_id)
            .cloned()
            .unwrap_or_else(|| CheckResponse::UnknownError {
                job_id: job_id.to_string(),
            })
    }

    async fn fetch_result(&self, job_id: &str) -> Result<GenerationStatus> {
        self.results
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no scripted result for {}", job_id))
    }

    async fn download_image(&self, url: &str) -> Result<Vec<u8>> {
        self.images
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("link expired: {}", url))
    }

    async fn heartbeat(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            anyhow::bail!("maintenance mode");
        }
        Ok(())
    }
}
