//! This module contains a process-wide cache of parsed source units, so that
//! one audit run does not re-parse the same contract for every function it
//! inspects.
//!
//! The cache is constructor-injected rather than a hidden singleton, so
//! tests can use a fresh cache per test. Entries are immutable once
//! inserted; a single mutex guards the insert-if-absent path and concurrent
//! readers share the parsed units through [`Arc`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::debug;

use crate::{chain::ChainId, parse::unit::SourceUnit};

/// The key identifying one parsed deployment in the cache.
///
/// The facet fingerprint distinguishes diamond deployments whose facet cut
/// changed between resolutions; plain contracts use a fingerprint of zero.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CacheKey {
    /// The chain the deployment lives on.
    chain: ChainId,

    /// The lower-cased address of the deployment.
    address: String,

    /// The fingerprint of the facet set, or zero for plain contracts.
    facet_fingerprint: u64,
}

impl CacheKey {
    /// Constructs a cache key for the deployment at `address` on `chain`
    /// with the provided `facet_fingerprint`.
    #[must_use]
    pub fn new(chain: ChainId, address: impl Into<String>, facet_fingerprint: u64) -> Self {
        let address = address.into().to_lowercase();
        Self {
            chain,
            address,
            facet_fingerprint,
        }
    }
}

/// A cache of parsed source units keyed by deployment.
#[derive(Debug, Default)]
pub struct ParseCache {
    /// The cached units. Entries are never replaced or removed.
    entries: Mutex<HashMap<CacheKey, Arc<SourceUnit>>>,
}

impl ParseCache {
    /// Creates a new, empty, cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the cached unit for `key`, parsing it from the text produced by
    /// `source` if it is not cached yet.
    ///
    /// The lock is held across the parse, so concurrent requests for the
    /// same deployment parse it exactly once.
    ///
    /// # Panics
    ///
    /// Panics if the cache mutex was poisoned by a panic in another thread.
    pub fn get_or_parse(&self, key: CacheKey, source: impl FnOnce() -> String) -> Arc<SourceUnit> {
        let mut entries = self.entries.lock().expect("Parse cache mutex was poisoned");

        if let Some(unit) = entries.get(&key) {
            debug!("Parse cache hit for {key:?}");
            return unit.clone();
        }

        debug!("Parse cache miss for {key:?}");
        let unit = Arc::new(SourceUnit::parse(source()));
        entries.insert(key, unit.clone());
        unit
    }

    /// Gets the number of cached units.
    ///
    /// # Panics
    ///
    /// Panics if the cache mutex was poisoned by a panic in another thread.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("Parse cache mutex was poisoned").len()
    }

    /// Checks if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::{CacheKey, ParseCache};
    use crate::chain::ChainId;

    #[test]
    fn parses_each_deployment_once() {
        let cache = ParseCache::new();
        let key = CacheKey::new(ChainId::ETHEREUM, "0xABCD", 0);

        let first = cache.get_or_parse(key.clone(), || "contract A { }".to_string());
        let second = cache.get_or_parse(key, || panic!("should not re-parse a cached unit"));

        assert!(std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_normalise_address_case() {
        assert_eq!(
            CacheKey::new(ChainId::ETHEREUM, "0xABCD", 1),
            CacheKey::new(ChainId::ETHEREUM, "0xabcd", 1)
        );
    }

    #[test]
    fn distinct_facet_cuts_are_cached_separately() {
        let cache = ParseCache::new();

        cache.get_or_parse(CacheKey::new(ChainId::ETHEREUM, "0xABCD", 1), || {
            "contract A { }".to_string()
        });
        cache.get_or_parse(CacheKey::new(ChainId::ETHEREUM, "0xABCD", 2), || {
            "contract A { }".to_string()
        });

        assert_eq!(cache.len(), 2);
    }
}
