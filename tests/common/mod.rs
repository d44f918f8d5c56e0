//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use dependency_closure_extractor as dce;
use dependency_closure_extractor::{
    chain::ChainId,
    collect,
    contract::Contract,
    resolver::InitialResolver,
    watchdog::LazyWatchdog,
};

/// The deployment address used for test contracts; the resolver only uses it
/// for cache keys.
pub const TEST_ADDRESS: &str = "0x00000000000000000000000000000000000000aa";

/// Constructs a new resolver over the provided Solidity `source`, placed on
/// Ethereum main-net at a fixed test address.
///
/// It uses the default configurations for the resolver.
#[allow(unused)] // It is actually
pub fn new_resolver_from_source(source: impl Into<String>) -> InitialResolver {
    let contract = Contract::new(source.into(), TEST_ADDRESS, ChainId::ETHEREUM);
    new_resolver_from_contract(contract)
}

/// Constructs a new resolver over the provided `contract`.
///
/// It uses the default configurations for the resolver.
#[allow(unused)] // It is actually
pub fn new_resolver_from_contract(contract: Contract) -> InitialResolver {
    dce::new(contract, collect::Config::default(), LazyWatchdog.in_rc())
}
