//! Crate error types.

use thiserror::Error;

/// Errors surfaced by the cache layer.
///
/// The store itself never fails: misses are `None`, deletes are idempotent.
/// The only fallible edge is encoding a cache key from caller-supplied
/// arguments.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Query arguments could not be serialized into a canonical key.
    #[error("cache key encoding failed for query `{query}`: {source}")]
    KeyEncoding {
        query: String,
        #[source]
        source: serde_json::Error,
    },

    /// Query identifier contains characters reserved by the key format.
    #[error("invalid query identifier `{query}`: must not contain `:`")]
    QueryIdentifier { query: String },
}
