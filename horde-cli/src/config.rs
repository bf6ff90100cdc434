//! Configuration module
//!
//! Handles CLI configuration: where Horde lives, how to identify to it and
//! where the local job store is.

use anyhow::{Context, Result};
use horde_client::HordeClient;
use horde_store::LocalJobStore;
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Horde API base URL
    pub api_url: String,
    /// Value sent in the `Client-Agent` header
    pub client_agent: String,
    /// Key sent with submissions
    pub api_key: String,
    /// Path of the SQLite job store
    pub db_path: PathBuf,
}

impl Config {
    /// Builds a Horde client from this configuration
    ///
    /// Fails if the client agent cannot be sent as a header.
    pub fn client(&self) -> Result<HordeClient> {
        horde_client::validate_client_agent(&self.client_agent)
            .context("Invalid --client-agent")?;
        Ok(HordeClient::new(&self.api_url, &self.client_agent).with_api_key(&self.api_key))
    }

    /// Opens the local job store
    pub fn open_store(&self) -> Result<LocalJobStore> {
        LocalJobStore::open(&self.db_path)
            .with_context(|| format!("Failed to open job store at {}", self.db_path.display()))
    }
}
