//! This module is an integration test that checks selector computation and
//! selector-first target resolution, including overload disambiguation.
#![cfg(test)]

use std::str::FromStr;

use dependency_closure_extractor::{
    resolver::{FunctionQuery, Resolution},
    signature::Selector,
};

mod common;

const TOKEN: &str = r"
contract Token {
    function transfer(address to, uint256 amount) external {
        to;
        amount;
    }
}
";

const OVERLOADED: &str = r"
contract Exchange {
    function swap(uint256 amount) external {
        amountOnlyImpl();
    }

    function swap(address token, uint256 amount) external {
        tokenAndAmountImpl();
    }

    function amountOnlyImpl() internal { }

    function tokenAndAmountImpl() internal { }
}
";

#[test]
fn resolves_a_known_erc20_selector() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(TOKEN);

    // The well-known `transfer(address,uint256)` selector.
    let selector = Selector::from_str("0xa9059cbb")?;
    let query = FunctionQuery::named("transfer").with_selector(selector).selector_only();

    let resolution = resolver.resolve_and_collect(&query)?;
    assert!(resolution.is_resolved());

    Ok(())
}

#[test]
fn disambiguates_overloads_by_selector() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(OVERLOADED);

    let selector = Selector::of_canonical("swap(address,uint256)");
    let query = FunctionQuery::named("swap").with_selector(selector).with_line_budget(100);

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    assert!(closure.function().contains("tokenAndAmountImpl"));
    assert!(!closure.function().contains("amountOnlyImpl"));
    assert!(closure.has_internal_function("tokenAndAmountImpl"));

    Ok(())
}

#[test]
fn a_signature_with_parameter_names_computes_the_same_selector() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(OVERLOADED);

    let query = FunctionQuery::named("swap")
        .with_signature("swap(address token, uint256 amount)")
        .with_line_budget(100);

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    assert!(closure.function().contains("tokenAndAmountImpl"));

    Ok(())
}

#[test]
fn selector_only_misses_report_not_found_with_candidates() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(OVERLOADED);

    // A selector that belongs to no declared overload.
    let selector = Selector::of_canonical("swap(bytes32)");
    let query = FunctionQuery::named("swap").with_selector(selector).selector_only();

    match resolver.resolve_and_collect(&query)? {
        Resolution::Resolved(_) => panic!("a missing selector must not resolve"),
        Resolution::NotFound(not_found) => {
            assert_eq!(not_found.name, "swap");
            assert_eq!(not_found.selector, Some(selector));
            assert_eq!(not_found.candidates.len(), 2);
            assert!(not_found.candidates.contains(&"swap(uint256)".to_string()));
            assert!(not_found.candidates.contains(&"swap(address,uint256)".to_string()));
        }
    }

    Ok(())
}

#[test]
fn interface_declarations_lose_to_concrete_implementations() -> anyhow::Result<()> {
    let source = r"
interface IToken {
    function transfer(address to, uint256 amount) external;
}

contract Token {
    function transfer(address to, uint256 amount) external {
        concreteImpl();
    }

    function concreteImpl() internal { }
}
";
    let resolver = common::new_resolver_from_source(source);
    let selector = Selector::from_str("0xa9059cbb")?;
    let query = FunctionQuery::named("transfer").with_selector(selector);

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    assert!(closure.function().contains("concreteImpl"));

    Ok(())
}
