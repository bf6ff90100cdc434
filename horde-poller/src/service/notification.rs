//! Image notification state
//!
//! Signals "a job finished" to whatever view consumes it. At most one notice
//! is outstanding: while the consumer has not acknowledged it, later notices
//! are dropped, so a burst of completions surfaces only the earliest one.

use tokio::sync::watch;

/// What happened to the job behind a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The image was stored and is ready to view
    Ready,
    /// The job failed on Horde after having been seen in progress
    Failed,
}

/// A notice about one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNotice {
    pub job_id: String,
    pub kind: NoticeKind,
}

impl ImageNotice {
    pub fn ready(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: NoticeKind::Ready,
        }
    }

    pub fn failed(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: NoticeKind::Failed,
        }
    }
}

/// Observable holder of the outstanding notice
pub struct NotificationState {
    tx: watch::Sender<Option<ImageNotice>>,
}

impl NotificationState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Publishes a notice unless one is still unacknowledged
    ///
    /// Returns whether the notice was published.
    pub fn publish(&self, notice: ImageNotice) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(notice);
            true
        })
    }

    /// Clears the outstanding notice, returning it
    pub fn acknowledge(&self) -> Option<ImageNotice> {
        let mut taken = None;
        self.tx.send_if_modified(|current| {
            taken = current.take();
            taken.is_some()
        });
        taken
    }

    pub fn current(&self) -> Option<ImageNotice> {
        self.tx.borrow().clone()
    }

    /// Receiver woken on every publish and acknowledge
    pub fn subscribe(&self) -> watch::Receiver<Option<ImageNotice>> {
        self.tx.subscribe()
    }
}

impl Default for NotificationState {
    fn default() -> Self {
        Self::new()
    }
}
