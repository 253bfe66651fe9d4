//! Cache configuration.
//!
//! `CacheConfig` is a plain serde-deserializable struct so host applications
//! can embed it under their own settings tree, e.g.:
//!
//! ```toml
//! [cache]
//! enabled = true
//! default_ttl_ms = 300000
//! sweep_interval_ms = 60000
//! ```

use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Configuration for the query cache layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch. When false, bindings never subscribe or touch the
    /// store and mutation dispatch is a logged no-op.
    pub enabled: bool,
    /// Default TTL applied to cached query results, in milliseconds.
    pub default_ttl_ms: u64,
    /// Interval between full TTL sweeps, in milliseconds.
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_ms: DEFAULT_TTL_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl CacheConfig {
    /// Returns true if the cache layer is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Default TTL as a `Duration`, clamping zero to one millisecond.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms.max(1))
    }

    /// Sweep interval as a `Duration`, clamping zero to one millisecond.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.default_ttl_ms, 300_000);
        assert_eq!(config.sweep_interval_ms, 60_000);
    }

    #[test]
    fn zero_durations_clamp_to_minimum() {
        let config = CacheConfig {
            default_ttl_ms: 0,
            sweep_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.default_ttl(), Duration::from_millis(1));
        assert_eq!(config.sweep_interval(), Duration::from_millis(1));
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: CacheConfig =
            serde_json::from_str(r#"{ "enabled": false }"#).expect("partial config");
        assert!(!config.is_enabled());
        assert_eq!(config.default_ttl_ms, 300_000);
    }
}
