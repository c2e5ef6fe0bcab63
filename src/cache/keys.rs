//! Cache key derivation and write-skip policy.

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::identifiers::ProductId;

/// Prefix shared by every cache key; `clear` removes everything under it.
pub const CACHE_NAMESPACE: &str = "spfa_";

/// Lookups with this many identifiers or more are never stored.
pub const MAX_CACHEABLE_IDS: usize = 4;

/// `spfa_` followed by the sorted, de-duplicated identifiers joined with `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Order-independent key for an identifier set.
    pub fn for_ids(ids: &[ProductId]) -> Self {
        let unique: BTreeSet<&str> = ids.iter().map(ProductId::as_str).collect();
        let joined = unique.into_iter().collect::<Vec<_>>().join("_");
        Self(format!("{CACHE_NAMESPACE}{joined}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a successful response for `id_count` identifiers may be stored.
pub fn should_store(id_count: usize, test_connection: bool) -> bool {
    !test_connection && id_count < MAX_CACHEABLE_IDS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<ProductId> {
        values
            .iter()
            .map(|value| ProductId::parse(value).expect("valid id"))
            .collect()
    }

    #[test]
    fn key_for_single_id() {
        assert_eq!(
            CacheKey::for_ids(&ids(&["B08N5WRWNW"])).as_str(),
            "spfa_B08N5WRWNW"
        );
    }

    #[test]
    fn key_is_order_independent_and_deduplicated() {
        let forward = CacheKey::for_ids(&ids(&["B08N5WRWNW", "B07XJ8C8F5"]));
        let reverse = CacheKey::for_ids(&ids(&["B07XJ8C8F5", "B08N5WRWNW", "B07XJ8C8F5"]));
        assert_eq!(forward, reverse);
        assert_eq!(forward.as_str(), "spfa_B07XJ8C8F5_B08N5WRWNW");
        assert!(forward.has_prefix(CACHE_NAMESPACE));
    }

    #[test]
    fn store_policy_skips_large_batches_and_tests() {
        assert!(should_store(1, false));
        assert!(should_store(3, false));
        assert!(!should_store(4, false));
        assert!(!should_store(1, true));
    }
}
