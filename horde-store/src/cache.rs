//! Read-through cache for completed records

use std::collections::HashMap;

use horde_core::domain::image::CompletedImage;
use parking_lot::Mutex;

/// Default number of records kept before the cache starts over
pub const DEFAULT_CAPACITY: usize = 128;

/// Explicit cache of completed records keyed by job id
///
/// Any write to a completed record must be followed by [`CompletedCache::invalidate`]
/// before the record is read again, otherwise the stale copy is served.
///
/// Records carry the full image payload, so the cache is bounded: inserting a
/// new key into a full cache clears it first.
#[derive(Debug)]
pub struct CompletedCache {
    entries: Mutex<HashMap<String, CompletedImage>>,
    capacity: usize,
}

impl CompletedCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, job_id: &str) -> Option<CompletedImage> {
        self.entries.lock().get(job_id).cloned()
    }

    pub fn set(&self, image: CompletedImage) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&image.job_id) {
            entries.clear();
        }
        entries.insert(image.job_id.clone(), image);
    }

    pub fn invalidate(&self, job_id: &str) {
        self.entries.lock().remove(job_id);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CompletedCache {
    fn default() -> Self {
        Self::new()
    }
}
