//! Storage key resolution.
//!
//! Every stored payload lives under a deterministic key computed from the
//! namespace, the record's store-assigned id and the version name:
//! `{middle_path(namespace)}/{id}/{version}`. Keys never depend on mutable
//! metadata such as the file name, so metadata updates never relocate
//! payload bytes.
//!
//! The *middle path* is the segment between the storage root and the file
//! name. By default it is simply the namespace, which gives the scheme
//! `bucket / namespace / id / version`. Integrators can interpose their own
//! segment (for instance to group several logical collections in one
//! bucket without clashing) by supplying a middle-path function per
//! orchestrator instance.
//!
//! An earlier scheme joined the same parts with a dash into a flat key.
//! [`KeyResolver::parse_legacy`] recognizes those keys so the migration
//! routine can rewrite a bucket in place.

use std::sync::Arc;

/// Separator used by the current key scheme. A slash lets object stores
/// expose nested prefixes.
pub const KEY_SEPARATOR: char = '/';

/// Separator used by the retired flat key scheme.
pub const LEGACY_SEPARATOR: char = '-';

/// Middle-path extension point: maps a namespace to the path segment
/// between the storage root and the record id.
pub type MiddlePathFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Computes storage keys for payloads.
#[derive(Clone)]
pub struct KeyResolver {
    middle_path: MiddlePathFn,
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyResolver {
    /// Resolver with the default middle path (the namespace itself).
    pub fn new() -> Self {
        Self {
            middle_path: Arc::new(|namespace: &str| namespace.to_string()),
        }
    }

    /// Resolver with a static prefix prepended to the namespace, e.g.
    /// prefix `"avatar"` maps namespace `"42"` to middle path `"avatar42"`.
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.to_string();
        Self {
            middle_path: Arc::new(move |namespace: &str| format!("{prefix}{namespace}")),
        }
    }

    /// Resolver with an arbitrary middle-path function.
    pub fn with_middle_path(middle_path: MiddlePathFn) -> Self {
        Self { middle_path }
    }

    /// The path segment between the storage root and the record id.
    pub fn middle_path(&self, namespace: &str) -> String {
        (self.middle_path)(namespace)
    }

    /// Compute the storage key for one stored artifact.
    ///
    /// Deterministic and injective for a fixed middle-path function: ids are
    /// numeric and version names contain no separator, so the last two
    /// segments always parse back unambiguously.
    pub fn resolve(&self, namespace: &str, record_id: i64, version: &str) -> String {
        format!(
            "{}{KEY_SEPARATOR}{record_id}{KEY_SEPARATOR}{version}",
            self.middle_path(namespace)
        )
    }

    /// Prefix under which all of a namespace's payloads live.
    pub fn namespace_prefix(&self, namespace: &str) -> String {
        format!("{}{KEY_SEPARATOR}", self.middle_path(namespace))
    }

    /// Compute the key one artifact had under the retired dash scheme.
    pub fn legacy_resolve(&self, namespace: &str, record_id: i64, version: &str) -> String {
        format!(
            "{}{LEGACY_SEPARATOR}{record_id}{LEGACY_SEPARATOR}{version}",
            self.middle_path(namespace)
        )
    }

    /// Prefix matching a namespace's keys under the retired dash scheme.
    pub fn legacy_prefix(&self, namespace: &str) -> String {
        format!("{}{LEGACY_SEPARATOR}", self.middle_path(namespace))
    }

    /// Parse a legacy key back into (record id, version name).
    ///
    /// Returns `None` for keys that do not belong to the namespace or do not
    /// follow the legacy layout; the migration skips those.
    pub fn parse_legacy(&self, namespace: &str, key: &str) -> Option<(i64, String)> {
        let rest = key.strip_prefix(&self.legacy_prefix(namespace))?;
        let (id_part, version) = rest.split_once(LEGACY_SEPARATOR)?;
        let record_id: i64 = id_part.parse().ok()?;
        if version.is_empty() {
            return None;
        }
        Some((record_id, version.to_string()))
    }
}

impl std::fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_deterministic() {
        let resolver = KeyResolver::new();
        let a = resolver.resolve("tenant7", 42, "original");
        let b = resolver.resolve("tenant7", 42, "original");
        assert_eq!(a, b);
        assert_eq!(a, "tenant7/42/original");
    }

    #[test]
    fn test_resolve_is_injective() {
        let resolver = KeyResolver::new();
        let mut keys = std::collections::HashSet::new();
        for namespace in ["a", "b", "a/b"] {
            for id in [1, 12, 123] {
                for version in ["original", "1920", "160"] {
                    assert!(
                        keys.insert(resolver.resolve(namespace, id, version)),
                        "collision for ({namespace}, {id}, {version})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_middle_path_prefix_override() {
        let resolver = KeyResolver::with_prefix("avatar");
        assert_eq!(resolver.middle_path("42"), "avatar42");
        assert_eq!(resolver.resolve("42", 7, "original"), "avatar42/7/original");
    }

    #[test]
    fn test_middle_path_closure_override() {
        let resolver = KeyResolver::with_middle_path(Arc::new(|ns: &str| format!("logos/{ns}")));
        assert_eq!(resolver.resolve("acme", 3, "480"), "logos/acme/3/480");
    }

    #[test]
    fn test_legacy_parse_roundtrip() {
        let resolver = KeyResolver::new();
        let key = resolver.legacy_resolve("tenant7", 42, "original");
        assert_eq!(key, "tenant7-42-original");
        assert_eq!(
            resolver.parse_legacy("tenant7", &key),
            Some((42, "original".to_string()))
        );
    }

    #[test]
    fn test_legacy_parse_rejects_foreign_keys() {
        let resolver = KeyResolver::new();
        assert_eq!(resolver.parse_legacy("tenant7", "tenant8-1-original"), None);
        assert_eq!(resolver.parse_legacy("tenant7", "tenant7-x-original"), None);
        assert_eq!(resolver.parse_legacy("tenant7", "tenant7-12"), None);
        assert_eq!(resolver.parse_legacy("tenant7", "tenant7-12-"), None);
    }
}
