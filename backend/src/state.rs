//! Application state management.

use crate::config::{Config, GeneralSettings};
use crate::environment;
use crate::release::{GithubTagsFetcher, VersionCache, VersionFetcher};
use std::sync::Arc;
use tracing::info;
use tvhub_types::Environment;

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    /// Backend and encoder reported by the version endpoint
    general: GeneralSettings,
    /// Environment detected at startup
    environment: Environment,
    /// Latest released version, refreshed on read
    version_cache: VersionCache,
}

impl AppState {
    /// Create application state from its parts.
    pub fn new(
        general: GeneralSettings,
        environment: Environment,
        version_cache: VersionCache,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                general,
                environment,
                version_cache,
            }),
        }
    }

    /// Create application state from configuration, querying the configured
    /// tags listing and detecting the host environment.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let update_check = &config.update_check;
        let fetcher = GithubTagsFetcher::new(
            update_check.tags_url.clone(),
            update_check.timeout,
            &update_check.user_agent,
        )?;
        info!(
            "Release check: {} (timeout {:?}, cached for {:?})",
            fetcher.url(),
            update_check.timeout,
            update_check.ttl
        );

        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create application state from configuration with a custom release source.
    pub fn with_fetcher(config: &Config, fetcher: Arc<dyn VersionFetcher>) -> Self {
        let environment = environment::detect();
        info!("Running on {}", environment);

        Self::new(
            config.general.clone(),
            environment,
            VersionCache::new(fetcher, config.update_check.ttl),
        )
    }

    /// Get the configured backend and encoder.
    pub fn general(&self) -> &GeneralSettings {
        &self.inner.general
    }

    /// Get the detected environment.
    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    /// Get the latest version cache.
    pub fn version_cache(&self) -> &VersionCache {
        &self.inner.version_cache
    }
}
