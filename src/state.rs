//! Application state management

use std::sync::Arc;

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::config::Config;
use crate::rate_limit::RateLimiter;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to prepare storage directory: {0}")]
    Storage(#[from] ArtifactError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    artifacts: ArtifactStore,
    rate_limiter: RateLimiter,
}

impl AppState {
    /// Create a new application state
    ///
    /// Creates the storage directory if it is missing.
    pub async fn new(config: Config) -> Result<Self, StateError> {
        let artifacts = ArtifactStore::new(config.storage.dir.clone(), config.retention());
        artifacts.init().await?;

        let rate_limiter = RateLimiter::new(
            config.limits.rate_limit_max,
            config.rate_limit_window(),
            config.limits.trust_proxy,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                artifacts,
                rate_limiter,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the artifact store
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.inner.artifacts
    }

    /// Get the rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    /// Start the background maintenance tasks (artifact sweep, limiter pruning)
    pub fn start_background_tasks(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let sweep_every = self.inner.config.sweep_interval();
        tracing::info!(
            interval_secs = sweep_every.as_secs(),
            retention_secs = self.inner.config.storage.retention_secs,
            "Starting artifact sweeper"
        );

        vec![
            self.inner.artifacts.clone().start_sweep_task(sweep_every),
            self.inner.rate_limiter.clone().start_prune_task(),
        ]
    }
}
