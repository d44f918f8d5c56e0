//! This module contains types useful for describing the concrete contract
//! deployment whose source you want to resolve against.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use derivative::Derivative;

use crate::{chain::ChainId, facet::FacetEntry, signature::Selector};

/// The contract deployment to resolve against.
///
/// The source text is the merged, possibly multi-file output of the fetching
/// layer (file boundaries marked with comments); for diamonds it may be the
/// concatenation of every facet's source. The contract is intended to be
/// immutable once constructed.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Contract {
    /// The merged source text of the deployment.
    #[derivative(Debug = "ignore")]
    source: String,

    /// The address the deployment lives at.
    address: String,

    /// The chain the deployment lives on.
    chain: ChainId,

    /// The facet hint produced by the caller's diamond detection, if any.
    facets: Option<FacetHint>,
}

impl Contract {
    /// Creates a new contract from the provided `source` text for the
    /// deployment at `address` on `chain`.
    #[must_use]
    pub fn new(source: impl Into<String>, address: impl Into<String>, chain: ChainId) -> Self {
        let source = source.into();
        let address = address.into();
        let facets = None;
        Self {
            source,
            address,
            chain,
            facets,
        }
    }

    /// Attaches the facet hint for a diamond deployment.
    #[must_use]
    pub fn with_facets(mut self, facets: FacetHint) -> Self {
        self.facets = Some(facets);
        self
    }

    /// Gets the merged source text of the deployment.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Gets the address the deployment lives at.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Gets the chain the deployment lives on.
    #[must_use]
    pub fn chain(&self) -> ChainId {
        self.chain
    }

    /// Gets the facet hint, if one was attached.
    #[must_use]
    pub fn facets(&self) -> Option<&FacetHint> {
        self.facets.as_ref()
    }
}

/// The raw facet information supplied by the caller for a diamond
/// deployment: which facet serves each selector, and the source text of each
/// facet.
///
/// Detecting the mapping (loupe calls, explorer queries) is the fetching
/// layer's job; this type only carries its results into the resolver.
#[derive(Clone, Default, Derivative)]
#[derivative(Debug)]
pub struct FacetHint {
    /// The facets recorded as serving each selector, in recording order.
    pub(crate) selectors: Vec<(Selector, Vec<FacetEntry>)>,

    /// The fetched source text of each facet, keyed by address.
    #[derivative(Debug = "ignore")]
    pub(crate) sources: Vec<(String, String)>,
}

impl FacetHint {
    /// Creates a new, empty, facet hint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `selector` is served by the provided facet `entries`.
    #[must_use]
    pub fn map_selector(mut self, selector: Selector, entries: Vec<FacetEntry>) -> Self {
        self.selectors.push((selector, entries));
        self
    }

    /// Records the fetched `source` text of the facet at `address`.
    #[must_use]
    pub fn with_source(mut self, address: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.push((address.into(), source.into()));
        self
    }

    /// Computes a fingerprint of the facet set, for use in parse-cache keys.
    ///
    /// The fingerprint covers the selector mappings and the facet addresses
    /// (case-insensitively), so a re-deployed diamond with a different facet
    /// cut hashes differently.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        let mut selectors: Vec<String> = self
            .selectors
            .iter()
            .flat_map(|(selector, entries)| {
                entries.iter().map(move |entry| {
                    format!("{selector}:{}:{}", entry.address.to_lowercase(), entry.chain)
                })
            })
            .collect();
        selectors.sort_unstable();
        selectors.hash(&mut hasher);

        let mut addresses: Vec<String> =
            self.sources.iter().map(|(address, _)| address.to_lowercase()).collect();
        addresses.sort_unstable();
        addresses.hash(&mut hasher);

        hasher.finish()
    }
}

#[cfg(test)]
mod test {
    use super::{Contract, FacetHint};
    use crate::{chain::ChainId, facet::FacetEntry, signature::Selector};

    #[test]
    fn fingerprints_ignore_address_case_and_recording_order() {
        let selector = Selector::from_bytes([0x11, 0x22, 0x33, 0x44]);

        let first = FacetHint::new()
            .map_selector(selector, vec![FacetEntry::new("0xAAAA", ChainId::ETHEREUM)])
            .with_source("0xAAAA", "contract A { }")
            .with_source("0xBBBB", "contract B { }");
        let second = FacetHint::new()
            .map_selector(selector, vec![FacetEntry::new("0xaaaa", ChainId::ETHEREUM)])
            .with_source("0xbbbb", "contract B { }")
            .with_source("0xaaaa", "contract A { }");

        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn fingerprints_distinguish_facet_cuts() {
        let selector = Selector::from_bytes([0x11, 0x22, 0x33, 0x44]);

        let first = FacetHint::new()
            .map_selector(selector, vec![FacetEntry::new("0xAAAA", ChainId::ETHEREUM)]);
        let second = FacetHint::new()
            .map_selector(selector, vec![FacetEntry::new("0xCCCC", ChainId::ETHEREUM)]);

        assert_ne!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn contracts_expose_their_deployment_coordinates() {
        let contract = Contract::new("contract C { }", "0xDEAD", ChainId::ETHEREUM);

        assert_eq!(contract.address(), "0xDEAD");
        assert_eq!(contract.chain(), ChainId::ETHEREUM);
        assert!(contract.facets().is_none());
    }
}
