//! Live query binding.
//!
//! Reconciles the value pushed by a live subscription with the cache store
//! to produce the value handed to a consumer, implementing
//! stale-while-revalidate:
//!
//! - every defined live delivery is written into the store (resetting its
//!   freshness clock) and becomes the consumer's value from then on;
//! - while the subscription has not yet delivered, a previously cached value
//!   is served instead of blocking, even one whose TTL already elapsed but
//!   that has not been swept yet;
//! - once a live value has been seen, the binding never again falls back to
//!   a cached value for its key, even if the stream temporarily reports
//!   nothing (e.g. on reconnect).

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::error::CacheError;
use super::key::QueryKey;
use super::store::CacheStore;

const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Per-call options for a cached query.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Freshness window for values written by this binding.
    pub ttl: Duration,
    /// Serve a cached value while the first live value is in flight.
    pub stale_while_revalidate: bool,
    /// When false, the binding neither subscribes nor touches the store and
    /// its value is permanently absent.
    pub enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            stale_while_revalidate: true,
            enabled: true,
        }
    }
}

/// Source of live query subscriptions.
///
/// Implemented by the transport layer. Each subscription delivers the
/// current value and re-delivers on every backend-visible change; `None`
/// means no value has arrived yet. Transport failures surface as a stream
/// that keeps reporting `None` — they are not handled here.
pub trait LiveQuerySource: Send + Sync {
    fn subscribe(&self, query: &str, args: &Value) -> BoxStream<'static, Option<Value>>;
}

/// Reconciliation state for one consumer's `(query, args)` pair.
///
/// Ephemeral: torn down when the consumer detaches. The cache entry it wrote
/// outlives it for any other binding sharing the key.
struct QueryBinding {
    store: Arc<CacheStore>,
    key: QueryKey,
    options: QueryOptions,
    live_seen: bool,
    current: Option<Value>,
}

impl QueryBinding {
    fn new(store: Arc<CacheStore>, key: QueryKey, options: QueryOptions) -> Self {
        Self {
            store,
            key,
            options,
            live_seen: false,
            current: None,
        }
    }

    /// Feed one subscription delivery through the reconciliation rule and
    /// return the value the consumer should see.
    fn observe(&mut self, live: Option<Value>) -> Option<Value> {
        match live {
            Some(value) => {
                self.store.set(&self.key, value.clone(), self.options.ttl);
                self.live_seen = true;
                self.current = Some(value);
            }
            None if !self.live_seen && self.options.stale_while_revalidate => {
                // Expired-but-unswept entries are still better than nothing
                // while the first live value is in flight.
                self.current = self.store.peek(&self.key);
                if self.current.is_some() {
                    debug!(key = %self.key, "Serving cached value while live query revalidates");
                }
            }
            // Fresh value wins: a live gap after the first delivery must not
            // displace it with a stale cached read.
            None => {}
        }
        self.current.clone()
    }
}

/// Consumer handle for one cached query.
///
/// Holds the driver task feeding subscription deliveries through the
/// binding. Dropping the handle detaches the consumer: it stops reacting to
/// live updates, but neither cancels the transport's own subscription nor
/// purges the cache entry.
pub struct CachedQuery {
    rx: watch::Receiver<Option<Value>>,
    task: Option<JoinHandle<()>>,
}

impl CachedQuery {
    /// Bind to `(query, args)` against `store`, driving deliveries from
    /// `source` on a spawned task. Must be called within a tokio runtime.
    pub(crate) fn bind(
        store: Arc<CacheStore>,
        source: &dyn LiveQuerySource,
        query: &str,
        args: &Value,
        options: QueryOptions,
    ) -> Result<Self, CacheError> {
        let key = QueryKey::new(query, args)?;

        if !options.enabled {
            let (_tx, rx) = watch::channel(None);
            return Ok(Self { rx, task: None });
        }

        let mut binding = QueryBinding::new(store, key, options);
        // Replay the cache before the first delivery lands.
        let initial = binding.observe(None);
        let (tx, rx) = watch::channel(initial);

        let mut stream = source.subscribe(query, args);
        let task = tokio::spawn(async move {
            while let Some(live) = stream.next().await {
                let value = binding.observe(live);
                if tx.send(value).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            rx,
            task: Some(task),
        })
    }

    /// The value currently visible to this consumer, or `None` while no
    /// value (live or cached) is available.
    pub fn current(&self) -> Option<Value> {
        self.rx.borrow().clone()
    }

    /// Wait for the next subscription delivery to be reconciled.
    ///
    /// Returns false once the binding's driver has stopped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl Drop for CachedQuery {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
