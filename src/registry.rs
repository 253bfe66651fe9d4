//! Invalidation registry.
//!
//! Maps mutation identifiers (dot-namespaced strings such as
//! `"projects.create"`) to the invalidation actions they fire. The table is
//! built once; dispatch walks every rule and fires those whose pattern
//! overlaps the incoming identifier.
//!
//! Matching is hierarchical: both strings are split on `.` and compared
//! segment by segment, and the shorter one must be a prefix of the longer.
//! `"projects"` therefore matches `"projects.create"` in either direction,
//! while `"project"` matches neither — substring accidents cannot occur.

use std::sync::Arc;

use tracing::debug;

use super::store::CacheStore;

/// An invalidation callback run against the store when a rule fires.
pub type InvalidateFn = Arc<dyn Fn(&CacheStore) + Send + Sync + 'static>;

/// One `(pattern, action)` pair in the registry.
pub struct InvalidationRule {
    pattern: String,
    action: InvalidateFn,
}

impl InvalidationRule {
    /// Create a rule firing `action` for identifiers overlapping `pattern`.
    pub fn new(pattern: impl Into<String>, action: InvalidateFn) -> Self {
        Self {
            pattern: pattern.into(),
            action,
        }
    }

    /// The dot-namespaced pattern this rule matches against.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Atomic action: purge the given query families from the store.
pub fn invalidate_families(families: &[&str]) -> InvalidateFn {
    let families: Vec<String> = families.iter().map(|f| f.to_string()).collect();
    Arc::new(move |store| {
        let patterns: Vec<&str> = families.iter().map(String::as_str).collect();
        store.invalidate_by_patterns(&patterns);
    })
}

/// Composite action: run each atomic action exactly once, in order.
pub fn compose(actions: Vec<InvalidateFn>) -> InvalidateFn {
    Arc::new(move |store| {
        for action in &actions {
            action(store);
        }
    })
}

/// Hierarchical overlap between two dot-namespaced identifiers: true when
/// the segments of one are a prefix of the segments of the other. This keeps
/// coarse patterns matching fine-grained identifiers (and vice versa)
/// without substring false positives.
pub(crate) fn segments_overlap(a: &str, b: &str) -> bool {
    a.split('.').zip(b.split('.')).all(|(x, y)| x == y)
}

/// Static table of invalidation rules consulted after every write.
pub struct InvalidationRegistry {
    rules: Vec<InvalidationRule>,
}

impl InvalidationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Builder-style rule registration.
    pub fn rule(mut self, pattern: impl Into<String>, action: InvalidateFn) -> Self {
        self.rules.push(InvalidationRule::new(pattern, action));
        self
    }

    /// The standard rule table for the business query families.
    ///
    /// Every write invalidates its own family plus the analytics family,
    /// since dashboards aggregate across all of them; task and expense
    /// writes additionally touch their parent project views.
    pub fn with_default_rules() -> Self {
        Self::new()
            .rule(
                "projects",
                compose(vec![
                    invalidate_families(&["projects"]),
                    invalidate_families(&["analytics"]),
                ]),
            )
            .rule(
                "contacts",
                compose(vec![
                    invalidate_families(&["contacts"]),
                    invalidate_families(&["analytics"]),
                ]),
            )
            .rule(
                "tasks",
                compose(vec![
                    invalidate_families(&["tasks"]),
                    invalidate_families(&["projects"]),
                    invalidate_families(&["analytics"]),
                ]),
            )
            .rule(
                "expenses",
                compose(vec![
                    invalidate_families(&["expenses"]),
                    invalidate_families(&["projects"]),
                    invalidate_families(&["analytics"]),
                ]),
            )
    }

    /// Fire every rule whose pattern overlaps `mutation`, returning the
    /// number of rules fired. Unmatched identifiers are a no-op.
    pub fn dispatch(&self, store: &CacheStore, mutation: &str) -> usize {
        let mut fired = 0;
        for rule in &self.rules {
            if segments_overlap(&rule.pattern, mutation) {
                debug!(mutation, pattern = %rule.pattern, "Invalidation rule fired");
                (rule.action)(store);
                fired += 1;
            }
        }
        if fired == 0 {
            debug!(mutation, "No invalidation rule matched");
        }
        fired
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the registry holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for InvalidationRegistry {
    fn default() -> Self {
        Self::with_default_rules()
    }
}
