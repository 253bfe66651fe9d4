//! Cache service.
//!
//! `CacheService` is the explicitly constructed, process-wide entry point:
//! hosts build one instance at startup and thread it through their own
//! context or dependency-injection boundary. Tests construct isolated
//! instances; there is no module-scoped global state.

use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::binding::{CachedQuery, LiveQuerySource, QueryOptions};
use super::config::CacheConfig;
use super::error::CacheError;
use super::registry::InvalidationRegistry;
use super::store::CacheStore;
use super::telemetry::METRIC_DISPATCH_TOTAL;

/// Process-wide cache facade: owns the store, consults the registry after
/// writes, and hands out query bindings.
pub struct CacheService {
    config: CacheConfig,
    store: Arc<CacheStore>,
    registry: InvalidationRegistry,
}

impl CacheService {
    /// Create a service with the given configuration and rule table.
    pub fn new(config: CacheConfig, registry: InvalidationRegistry) -> Self {
        Self {
            config,
            store: Arc::new(CacheStore::new()),
            registry,
        }
    }

    /// The underlying store, shared with every binding this service hands out.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Query options seeded with the configured default TTL.
    pub fn default_options(&self) -> QueryOptions {
        QueryOptions {
            ttl: self.config.default_ttl(),
            ..Default::default()
        }
    }

    /// Bind a consumer to `(query, args)`, reconciling live deliveries from
    /// `source` with the store. With the cache disabled the binding is inert:
    /// no subscription, no store traffic, permanently absent value.
    pub fn cached_query(
        &self,
        source: &dyn LiveQuerySource,
        query: &str,
        args: &Value,
        mut options: QueryOptions,
    ) -> Result<CachedQuery, CacheError> {
        if !self.config.is_enabled() {
            options.enabled = false;
        }
        CachedQuery::bind(Arc::clone(&self.store), source, query, args, options)
    }

    /// Fire every registry rule matching `mutation`.
    ///
    /// Called after every successful write so callers never manage cache
    /// consistency by hand. Unmatched identifiers are a silent no-op.
    pub fn dispatch(&self, mutation: &str) {
        if !self.config.is_enabled() {
            debug!(mutation, "Invalidation dispatch skipped: cache disabled");
            return;
        }
        let fired = self.registry.dispatch(&self.store, mutation);
        counter!(METRIC_DISPATCH_TOTAL).increment(fired as u64);
        info!(mutation, fired, "Invalidation dispatch complete");
    }

    /// Run a mutation and dispatch its identifier on success.
    ///
    /// This is the auto-invalidation seam: write paths wrap their calls here
    /// so a succeeding mutation always purges the reads it affects, while a
    /// failing one leaves the cache untouched.
    pub async fn run_mutation<T, E, F>(&self, mutation: &str, op: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let result = op.await;
        if result.is_ok() {
            self.dispatch(mutation);
        }
        result
    }

    /// Purge every cached entry whose query family contains one of `patterns`.
    pub fn invalidate_queries(&self, patterns: &[&str]) {
        self.store.invalidate_by_patterns(patterns);
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Spawn the periodic TTL sweeper on the current tokio runtime.
    ///
    /// Runs [`CacheStore::cleanup`] every `sweep_interval_ms` independent of
    /// read/write traffic. The returned handle lets the host abort the task
    /// on shutdown.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let period = self.config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; skip it so the initial
            // sweep happens one full period after startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.cleanup();
            }
        })
    }
}
