//! This module is an integration test that checks the stable ordering of the
//! closure's sections, its serialized form, and the watchdog's ability to
//! stop a collection.
#![cfg(test)]

use std::sync::{atomic::AtomicBool, Arc};

use dependency_closure_extractor as dce;
use dependency_closure_extractor::{
    cache::ParseCache,
    chain::ChainId,
    closure::DependencyClosure,
    collect,
    contract::Contract,
    resolver::FunctionQuery,
    watchdog::FlagWatchdog,
};

mod common;

const SOURCE: &str = r"
contract Orchestrator {
    function execute(uint256 amount) external {
        second(amount);
        first(amount);
    }

    function first(uint256 a) internal {
        a;
    }

    function second(uint256 b) internal {
        third(b);
    }

    function third(uint256 c) internal {
        c;
    }
}
";

#[test]
fn internal_functions_are_ordered_first_referenced_first() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);
    let query = FunctionQuery::named("execute").with_signature("execute(uint256 amount)");

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    let order: Vec<&str> = closure
        .internal_functions()
        .iter()
        .map(|f| {
            if f.body.contains("function second") {
                "second"
            } else if f.body.contains("function third") {
                "third"
            } else {
                "first"
            }
        })
        .collect();

    // `second` and `first` are referenced by the target in that order;
    // `third` is only discovered inside `second`.
    assert_eq!(order, vec!["second", "first", "third"]);

    Ok(())
}

#[test]
fn closures_round_trip_through_serde() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);
    let query = FunctionQuery::named("execute").with_signature("execute(uint256 amount)");

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    let encoded = serde_json::to_string(closure)?;
    let decoded: DependencyClosure = serde_json::from_str(&encoded)?;

    assert_eq!(&decoded, closure);

    Ok(())
}

#[test]
fn a_stopped_watchdog_aborts_the_collection() {
    let flag = Arc::new(AtomicBool::new(true));
    let watchdog = FlagWatchdog::new(flag).polling_every(1).in_rc();

    let contract = Contract::new(SOURCE, common::TEST_ADDRESS, ChainId::ETHEREUM);
    let resolver = dce::new(contract, collect::Config::default(), watchdog);
    let query = FunctionQuery::named("execute").with_signature("execute(uint256 amount)");

    let outcome = resolver.resolve_and_collect(&query);
    assert!(outcome.is_err());
}

#[test]
fn cached_resolutions_parse_the_source_once() -> anyhow::Result<()> {
    let cache = ParseCache::new();

    for _ in 0..3 {
        let resolver = common::new_resolver_from_source(SOURCE);
        let query = FunctionQuery::named("execute").with_signature("execute(uint256 amount)");
        let resolution = resolver.resolve_and_collect_with_cache(&query, &cache)?;
        assert!(resolution.is_resolved());
    }

    assert_eq!(cache.len(), 1);

    Ok(())
}
