//! This module contains the facet scoping used when resolving functions on
//! diamond proxies.
//!
//! A diamond serves each selector from exactly one facet contract, and the
//! facets are compiled independently: two facets can declare structs with the
//! same name but different field layouts. Resolving a selector against the
//! merged symbol table of every facet therefore risks silently picking up
//! the wrong definition. When the caller supplies a facet hint (produced by
//! its own on-chain diamond detection, which is outside this library), all
//! symbol lookups for the resolution are restricted to the facet that
//! actually serves the selector.

use std::{collections::HashMap, sync::Arc};

use log::debug;

use crate::{chain::ChainId, parse::unit::SourceUnit, signature::Selector};

/// One facet recorded as serving a selector.
///
/// Multiple entries can exist for the same selector when the diamond is
/// deployed on several chains; the entry matching the chain being resolved
/// wins, and the others act as fallback sources for resilience when one
/// facet's source could not be fetched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FacetEntry {
    /// The address of the facet contract, in any letter case.
    pub address: String,

    /// The chain the facet is deployed on.
    pub chain: ChainId,

    /// The human-readable signature the selector was derived from, when the
    /// caller knows it.
    pub signature: Option<String>,
}

impl FacetEntry {
    /// Constructs a new facet entry for `address` on `chain`.
    #[must_use]
    pub fn new(address: impl Into<String>, chain: ChainId) -> Self {
        let address = address.into();
        let signature = None;
        Self {
            address,
            chain,
            signature,
        }
    }

    /// Attaches the human-readable `signature` the selector was derived
    /// from.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// The caller-supplied mapping that scopes selector resolution to facets.
///
/// The scope pairs a `selector -> facets` table with a
/// `facet address -> SourceUnit` table. It consumes the mapping; computing
/// it (on-chain loupe calls, explorer queries) belongs to the fetching
/// layer.
#[derive(Clone, Debug, Default)]
pub struct FacetScope {
    /// The facets recorded as serving each selector.
    selector_facets: HashMap<Selector, Vec<FacetEntry>>,

    /// The parsed source of each facet, keyed by lower-cased address.
    units: HashMap<String, Arc<SourceUnit>>,
}

impl FacetScope {
    /// Creates a new, empty, facet scope.
    #[must_use]
    pub fn new() -> Self {
        let selector_facets = HashMap::new();
        let units = HashMap::new();
        Self {
            selector_facets,
            units,
        }
    }

    /// Records that `selector` is served by `entry`.
    pub fn record_selector(&mut self, selector: Selector, entry: FacetEntry) {
        self.selector_facets.entry(selector).or_default().push(entry);
    }

    /// Registers the parsed source `unit` for the facet at `address`.
    ///
    /// Addresses are compared case-insensitively.
    pub fn register_unit(&mut self, address: impl Into<String>, unit: impl Into<Arc<SourceUnit>>) {
        self.units.insert(address.into().to_lowercase(), unit.into());
    }

    /// Checks whether the scope contains any selector mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selector_facets.is_empty()
    }

    /// Gets the facet entries recorded for `selector`.
    #[must_use]
    pub fn entries_for(&self, selector: &Selector) -> &[FacetEntry] {
        self.selector_facets
            .get(selector)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Picks the facet source unit that serves `selector` on `chain`.
    ///
    /// The entry whose chain matches is preferred; when none matches (or the
    /// matching facet's source is missing), the remaining entries are tried
    /// in recorded order as fallbacks. Returns [`None`] when the scope holds
    /// no usable facet for the selector, in which case resolution falls back
    /// to the merged symbol table.
    #[must_use]
    pub fn unit_for(&self, selector: &Selector, chain: ChainId) -> Option<Arc<SourceUnit>> {
        let entries = self.entries_for(selector);
        if entries.is_empty() {
            debug!("No facet mapping for selector {selector}; using merged source");
            return None;
        }

        let on_chain = entries.iter().filter(|entry| entry.chain == chain);
        let off_chain = entries.iter().filter(|entry| entry.chain != chain);

        for entry in on_chain.chain(off_chain) {
            if let Some(unit) = self.units.get(&entry.address.to_lowercase()) {
                debug!(
                    "Selector {selector} scoped to facet {} on chain {}",
                    entry.address, entry.chain
                );
                return Some(unit.clone());
            }
        }

        debug!("Facet mapping for selector {selector} has no fetched source; using merged source");
        None
    }
}

#[cfg(test)]
mod test {
    use super::{FacetEntry, FacetScope};
    use crate::{chain::ChainId, parse::unit::SourceUnit, signature::Selector};

    fn selector() -> Selector {
        Selector::from_bytes([0x11, 0x22, 0x33, 0x44])
    }

    #[test]
    fn prefers_the_facet_on_the_current_chain() {
        let mut scope = FacetScope::new();
        scope.record_selector(selector(), FacetEntry::new("0xAAAA", ChainId::new(10)));
        scope.record_selector(selector(), FacetEntry::new("0xBBBB", ChainId::ETHEREUM));

        scope.register_unit("0xaaaa", SourceUnit::parse("contract OnOptimism { }"));
        scope.register_unit("0xbbbb", SourceUnit::parse("contract OnMainnet { }"));

        let unit = scope.unit_for(&selector(), ChainId::ETHEREUM).unwrap();
        assert_eq!(unit.main_contract(), Some("OnMainnet"));
    }

    #[test]
    fn falls_back_to_other_chains_when_the_preferred_source_is_missing() {
        let mut scope = FacetScope::new();
        scope.record_selector(selector(), FacetEntry::new("0xAAAA", ChainId::ETHEREUM));
        scope.record_selector(selector(), FacetEntry::new("0xBBBB", ChainId::new(137)));

        // Only the Polygon facet's source was fetched successfully.
        scope.register_unit("0xbbbb", SourceUnit::parse("contract Fallback { }"));

        let unit = scope.unit_for(&selector(), ChainId::ETHEREUM).unwrap();
        assert_eq!(unit.main_contract(), Some("Fallback"));
    }

    #[test]
    fn addresses_match_case_insensitively() {
        let mut scope = FacetScope::new();
        scope.record_selector(selector(), FacetEntry::new("0xAbCd", ChainId::ETHEREUM));
        scope.register_unit("0xABCD", SourceUnit::parse("contract Facet { }"));

        assert!(scope.unit_for(&selector(), ChainId::ETHEREUM).is_some());
    }

    #[test]
    fn unmapped_selectors_fall_back_to_the_merged_table() {
        let scope = FacetScope::new();
        assert!(scope.unit_for(&selector(), ChainId::ETHEREUM).is_none());
    }
}
