//! Metric registration for the cache layer.
//!
//! Host applications call [`describe_metrics`] once at startup so exporters
//! can attach units and descriptions. Recording happens inline at each cache
//! decision point; this module only owns the names.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

pub(crate) const METRIC_HIT_TOTAL: &str = "corrente_cache_hit_total";
pub(crate) const METRIC_MISS_TOTAL: &str = "corrente_cache_miss_total";
pub(crate) const METRIC_EXPIRED_TOTAL: &str = "corrente_cache_expired_total";
pub(crate) const METRIC_INVALIDATED_TOTAL: &str = "corrente_cache_invalidated_total";
pub(crate) const METRIC_DISPATCH_TOTAL: &str = "corrente_cache_dispatch_total";
pub(crate) const METRIC_ENTRIES: &str = "corrente_cache_entries";
pub(crate) const METRIC_SWEEP_MS: &str = "corrente_cache_sweep_ms";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Register units and descriptions for every metric this crate records.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT_TOTAL,
            Unit::Count,
            "Total number of cache reads served from a fresh entry."
        );
        describe_counter!(
            METRIC_MISS_TOTAL,
            Unit::Count,
            "Total number of cache reads that found no usable entry."
        );
        describe_counter!(
            METRIC_EXPIRED_TOTAL,
            Unit::Count,
            "Total number of entries discarded because their TTL elapsed."
        );
        describe_counter!(
            METRIC_INVALIDATED_TOTAL,
            Unit::Count,
            "Total number of entries removed by pattern invalidation."
        );
        describe_counter!(
            METRIC_DISPATCH_TOTAL,
            Unit::Count,
            "Total number of invalidation rules fired by mutation dispatch."
        );
        describe_gauge!(
            METRIC_ENTRIES,
            Unit::Count,
            "Current number of entries held by the cache store."
        );
        describe_histogram!(
            METRIC_SWEEP_MS,
            Unit::Milliseconds,
            "Latency of a full TTL sweep in milliseconds."
        );
    });
}
