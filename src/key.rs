//! Cache key codec.
//!
//! A cache key is the canonical string form of one `(query identifier,
//! arguments)` pair: `q:<query-id>:<canonical-args-json>`. Two argument
//! records that are deeply equal always encode to the same key, regardless
//! of how their object fields were ordered at the call site: object keys are
//! sorted recursively before serialization.
//!
//! Arguments that cannot be represented as JSON are rejected at encode time
//! rather than producing an unstable key.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::CacheError;

const KEY_PREFIX: &str = "q:";

/// Canonical cache key for one `(query identifier, arguments)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    /// Encode a key from a query identifier and its argument record.
    ///
    /// The identifier is dot-namespaced (`"projects.list"`) and must not
    /// contain `:`, which delimits the key components.
    pub fn new<A: Serialize>(query: &str, args: &A) -> Result<Self, CacheError> {
        if query.is_empty() || query.contains(':') {
            return Err(CacheError::QueryIdentifier {
                query: query.to_string(),
            });
        }
        let args = serde_json::to_value(args).map_err(|source| CacheError::KeyEncoding {
            query: query.to_string(),
            source,
        })?;

        let mut raw = String::with_capacity(KEY_PREFIX.len() + query.len() + 16);
        raw.push_str(KEY_PREFIX);
        raw.push_str(query);
        raw.push(':');
        write_canonical(&args, &mut raw);
        Ok(Self(raw))
    }

    /// The full encoded key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The query-identifier component of this key.
    pub fn query_id(&self) -> &str {
        // Encoding validated the identifier, so decode cannot fail here.
        decode(&self.0).map(|(query, _)| query).unwrap_or_default()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a raw key back into its `(query identifier, args JSON)` components.
///
/// Returns `None` for strings that were not produced by [`QueryKey::new`].
pub(crate) fn decode(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix(KEY_PREFIX)?;
    let (query, args) = rest.split_once(':')?;
    if query.is_empty() {
        return None;
    }
    Some((query, args))
}

/// Write a compact JSON rendition of `value` with object keys sorted
/// recursively, so the output does not depend on map insertion order.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Strings always serialize cleanly.
                out.push_str(&serde_json::to_string(k).unwrap_or_default());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar).unwrap_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encodes_query_and_args() {
        let key = QueryKey::new("projects.list", &json!({})).expect("key");
        assert_eq!(key.as_str(), "q:projects.list:{}");
        assert_eq!(key.query_id(), "projects.list");
    }

    #[test]
    fn equal_args_yield_equal_keys() {
        let a = QueryKey::new("tasks.by_project", &json!({"project": "p1", "done": false}));
        let b = QueryKey::new("tasks.by_project", &json!({"done": false, "project": "p1"}));
        assert_eq!(a.expect("a").as_str(), b.expect("b").as_str());
    }

    #[test]
    fn nested_object_keys_are_sorted() {
        let key = QueryKey::new(
            "contacts.search",
            &json!({"filter": {"z": 1, "a": {"y": 2, "b": 3}}, "limit": 10}),
        )
        .expect("key");
        assert_eq!(
            key.as_str(),
            r#"q:contacts.search:{"filter":{"a":{"b":3,"y":2},"z":1},"limit":10}"#
        );
    }

    #[test]
    fn different_args_yield_different_keys() {
        let a = QueryKey::new("projects.list", &json!({"page": 1})).expect("a");
        let b = QueryKey::new("projects.list", &json!({"page": 2})).expect("b");
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn rejects_reserved_identifier() {
        assert!(QueryKey::new("projects:list", &json!({})).is_err());
        assert!(QueryKey::new("", &json!({})).is_err());
    }

    #[test]
    fn rejects_unserializable_args() {
        use std::collections::HashMap;

        // Maps with non-string keys are not representable as JSON objects.
        let mut args: HashMap<Vec<u8>, u32> = HashMap::new();
        args.insert(vec![1, 2], 3);
        let err = QueryKey::new("projects.list", &args).unwrap_err();
        assert!(matches!(err, CacheError::KeyEncoding { .. }));
    }

    #[test]
    fn decode_roundtrip() {
        let key = QueryKey::new("expenses.list", &json!({"month": "2026-08"})).expect("key");
        let (query, args) = decode(key.as_str()).expect("decode");
        assert_eq!(query, "expenses.list");
        assert_eq!(args, r#"{"month":"2026-08"}"#);
    }

    #[test]
    fn decode_rejects_foreign_strings() {
        assert!(decode("not-a-key").is_none());
        assert!(decode("q:").is_none());
        assert!(decode("q::{}").is_none());
    }
}
