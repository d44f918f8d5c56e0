//! This module is an integration test that checks resolution and collection
//! across an inheritance chain with an overriding child contract.
#![cfg(test)]

use dependency_closure_extractor::resolver::FunctionQuery;

mod common;

const SOURCE: &str = r"
contract Parent {
    function f(uint256 x) public virtual {
        x;
    }
}

contract Child is Parent {
    function f(uint256 x) external override {
        super.f(x);
        helper(x);
    }

    function helper(uint256 y) internal {
        y;
    }
}
";

#[test]
fn selects_the_child_override_by_selector() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);
    let query = FunctionQuery::named("f").with_signature("f(uint256 x)");

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    // The most-derived implementation wins, not the virtual parent.
    assert!(closure.function().contains("external override"));
    assert!(closure.function().contains("super.f(x)"));

    Ok(())
}

#[test]
fn collects_the_helper_and_the_parent_implementation() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);
    let query = FunctionQuery::named("f").with_signature("f(uint256 x)");

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    assert!(closure.has_internal_function("helper"));
    assert!(closure.has_parent_function("Parent", "f"));

    // The parent implementation must appear exactly once, as a parent
    // function, and never again as an internal function.
    assert_eq!(closure.internal_functions().len(), 1);
    assert_eq!(closure.parent_functions().len(), 1);
    assert!(!closure.has_internal_function("f"));

    Ok(())
}

#[test]
fn name_based_resolution_prefers_the_non_virtual_override() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);
    let query = FunctionQuery::named("f");

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    assert!(closure.function().contains("external override"));

    Ok(())
}
