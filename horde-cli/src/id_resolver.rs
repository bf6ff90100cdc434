//! ID resolver module
//!
//! Resolves job id prefixes against the local store so users can type a few
//! characters of a Horde job id instead of the full value.

use anyhow::{Result, anyhow};
use horde_store::LocalJobStore;

/// Which part of the store a job id is looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Pending,
    Completed,
    Any,
}

/// Resolve a job id or unambiguous prefix to a full job id
///
/// An exact match always wins, even if it is also the prefix of another id.
///
/// # Errors
/// Returns an error if:
/// - No job in `scope` matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - Reading the store fails
pub fn resolve_job_id(store: &LocalJobStore, input: &str, scope: Scope) -> Result<String> {
    let prefix = input.trim().to_lowercase();
    if prefix.is_empty() {
        return Err(anyhow!("Job ID cannot be empty"));
    }

    let mut candidates = Vec::new();
    if scope != Scope::Completed {
        candidates.extend(store.list_pending()?.into_iter().map(|j| j.job_id));
    }
    if scope != Scope::Pending {
        candidates.extend(store.list_completed(false)?.into_iter().map(|i| i.job_id));
    }

    if let Some(exact) = candidates.iter().find(|id| id.to_lowercase() == prefix) {
        return Ok(exact.clone());
    }

    let mut matches: Vec<String> = candidates
        .into_iter()
        .filter(|id| id.to_lowercase().starts_with(&prefix))
        .collect();
    matches.dedup();

    match matches.len() {
        0 => Err(anyhow!("No job found with ID starting with '{}'", prefix)),
        1 => Ok(matches.remove(0)),
        _ => Err(anyhow!(
            "Ambiguous prefix '{}' matches multiple jobs: {}",
            prefix,
            matches.join(", ")
        )),
    }
}
