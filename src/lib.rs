//! Corrente Query Cache
//!
//! Reconciles a push-based live-subscription data source with a pull-based,
//! TTL-expiring in-memory cache, and lets writers selectively invalidate the
//! exact set of cached reads they affect.
//!
//! - **[`CacheStore`]**: keyed, TTL-aware value store with lazy expiration
//!   and pattern-based bulk invalidation
//! - **[`QueryKey`]**: canonical `(query identifier, arguments)` key codec
//! - **[`CachedQuery`]**: per-consumer binding implementing
//!   stale-while-revalidate against a [`LiveQuerySource`]
//! - **[`InvalidationRegistry`]**: static mutation → invalidation rule table
//! - **[`CacheService`]**: explicitly constructed process-wide facade wiring
//!   the pieces together, including auto-invalidation after mutations and a
//!   periodic TTL sweeper
//!
//! ## Configuration
//!
//! [`CacheConfig`] is serde-deserializable for embedding in a host settings
//! tree:
//!
//! ```toml
//! [cache]
//! enabled = true
//! default_ttl_ms = 300000
//! sweep_interval_ms = 60000
//! ```

mod binding;
mod config;
mod error;
mod key;
mod lock;
mod registry;
mod service;
mod store;
pub mod telemetry;

pub use binding::{CachedQuery, LiveQuerySource, QueryOptions};
pub use config::CacheConfig;
pub use error::CacheError;
pub use key::QueryKey;
pub use registry::{
    InvalidateFn, InvalidationRegistry, InvalidationRule, compose, invalidate_families,
};
pub use service::CacheService;
pub use store::CacheStore;
