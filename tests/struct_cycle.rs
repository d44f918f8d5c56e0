//! This module is an integration test that checks that mutually recursive
//! struct definitions terminate resolution instead of hanging it.
#![cfg(test)]

use dependency_closure_extractor::{parse::unit::SourceUnit, resolver::FunctionQuery, signature};

mod common;

const SOURCE: &str = r"
struct X {
    Y other;
}

struct Y {
    X other;
}

contract Registry {
    function record(X memory item) external {
        item;
    }
}
";

#[test]
fn cyclic_structs_are_unresolvable_in_the_tuple_mapping() {
    let unit = SourceUnit::parse(SOURCE);
    let types = signature::types::TypeMapping::for_unit(&unit);
    let structs = signature::types::StructTupleMapping::for_unit(&unit, &types);

    assert_eq!(structs.resolve("X"), None);
    assert_eq!(structs.resolve("Y"), None);
}

#[test]
fn resolution_still_terminates_and_collects_the_cycle_members() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);
    let query = FunctionQuery::named("record");

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    // The tuple mapping cannot represent the cycle, but the closure can
    // still carry both definitions for the reader.
    assert!(closure.has_struct("X"));
    assert!(closure.has_struct("Y"));

    Ok(())
}

#[test]
fn a_selector_computed_over_the_cycle_cannot_match() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);

    // `X` has no tuple form, so the canonical signature retains the bare
    // name and its selector matches nothing on chain. The query demands a
    // selector match, so the resolver reports not-found rather than
    // guessing.
    let selector = signature::Selector::of_canonical("record((uint256))");
    let query = FunctionQuery::named("record").with_selector(selector).selector_only();

    let resolution = resolver.resolve_and_collect(&query)?;
    assert!(!resolution.is_resolved());

    Ok(())
}
