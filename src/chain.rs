//! This module contains the identifier for the chain a contract deployment
//! lives on.
//!
//! The resolver itself performs no chain-specific behaviour; the identifier
//! exists so that facet hints recorded for several deployments of the same
//! diamond can be matched against the deployment actually being resolved,
//! and so that parse-cache keys distinguish same-address deployments on
//! different chains.

use serde::{Deserialize, Serialize};

/// The numeric identifier of a chain, as used by wallets and explorers.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct ChainId(u64);

impl ChainId {
    /// Ethereum main-net.
    pub const ETHEREUM: ChainId = ChainId(1);

    /// Constructs a chain identifier from its numeric `id`.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Gets the numeric value of the identifier.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
