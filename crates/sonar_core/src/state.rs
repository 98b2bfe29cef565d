//! Application state management.
//!
//! Holds the loaded config, local storage and one logs client per
//! `profile:region` pair.

use crate::config::{ResolvedProfile, SonarConfig};
use crate::error::SonarError;
use crate::services::{AwsLogsService, LocalStorage, LogsInsightsService};

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Central application state.
///
/// Thread-safe via `parking_lot::RwLock`.
pub struct SonarState {
    config: SonarConfig,
    storage: Arc<LocalStorage>,
    data_dir: PathBuf,
    clients: RwLock<HashMap<String, Arc<dyn LogsInsightsService>>>,
}

impl SonarState {
    /// Create state in the default data directory.
    pub fn new(config_path: Option<&Path>) -> Result<Self, SonarError> {
        let data_dir = crate::services::storage::default_data_dir();
        Self::with_data_dir(data_dir, config_path)
    }

    /// Create state with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf, config_path: Option<&Path>) -> Result<Self, SonarError> {
        crate::services::storage::init_data_dir(&data_dir)?;

        let config = SonarConfig::load(config_path, &data_dir)?;
        let storage = Arc::new(LocalStorage::open(data_dir.clone())?);

        tracing::info!(data_dir = %data_dir.display(), "SonarState initialized");

        Ok(Self { config, storage, data_dir, clients: RwLock::new(HashMap::new()) })
    }

    // ========== Client Management ==========

    /// Get the logs client for a profile, creating it on first use.
    pub async fn client(&self, profile: &ResolvedProfile) -> Arc<dyn LogsInsightsService> {
        let key = profile.cache_key();
        let cached = self.clients.read().get(&key).cloned();
        if let Some(client) = cached {
            return client;
        }

        let client: Arc<dyn LogsInsightsService> = Arc::new(AwsLogsService::connect(profile).await);

        // Another task may have connected meanwhile; keep the first one.
        self.clients.write().entry(key).or_insert(client).clone()
    }

    /// Register a client for a profile.
    pub fn insert_client(&self, profile: &ResolvedProfile, client: Arc<dyn LogsInsightsService>) {
        let key = profile.cache_key();
        tracing::debug!(key = %key, "Client registered");
        self.clients.write().insert(key, client);
    }

    /// Drop the cached client for a profile.
    pub fn remove_client(&self, profile: &ResolvedProfile) -> bool {
        self.clients.write().remove(&profile.cache_key()).is_some()
    }

    /// Keys of all cached clients.
    pub fn client_keys(&self) -> Vec<String> {
        self.clients.read().keys().cloned().collect()
    }

    // ========== Accessors ==========

    /// Resolve a profile against the loaded config.
    pub fn resolve_profile(&self, profile: Option<&str>, region: Option<&str>) -> ResolvedProfile {
        self.config.resolve_profile(profile, region)
    }

    /// Get the loaded config.
    pub fn config(&self) -> &SonarConfig {
        &self.config
    }

    /// Get the local storage service.
    pub fn storage(&self) -> &Arc<LocalStorage> {
        &self.storage
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
