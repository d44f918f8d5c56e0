//! This module is an integration test that checks library calls, `using`
//! statements, and constant chains are folded into the closure.
#![cfg(test)]

use dependency_closure_extractor::resolver::FunctionQuery;

mod common;

const SOURCE: &str = r"
library LibAsset {
    address internal constant NULL_ADDRESS = address(0);
    address internal constant NATIVE_ASSETID = NULL_ADDRESS;

    function isNativeAsset(address asset) internal pure returns (bool) {
        return asset == NATIVE_ASSETID;
    }
}

contract Spender {
    using LibAsset for address;

    function spend(address asset, uint256 amount) external {
        LibAsset.isNativeAsset(asset);
        deduct(amount);
    }

    function deduct(uint256 amount) internal {
        amount;
    }
}
";

#[test]
fn collects_library_functions_exactly_once() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);
    let query = FunctionQuery::named("spend").with_signature("spend(address asset, uint256 amount)");

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    // `isNativeAsset` is discovered both as a plain call site and as the
    // qualified `LibAsset.isNativeAsset` call; it must appear once.
    assert!(closure.has_internal_function("isNativeAsset"));
    assert!(closure.has_internal_function("deduct"));
    assert_eq!(closure.internal_functions().len(), 2);

    Ok(())
}

#[test]
fn includes_the_library_definition_and_its_using_statement() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);
    let query = FunctionQuery::named("spend").with_signature("spend(address asset, uint256 amount)");

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    assert_eq!(closure.libraries().len(), 1);
    assert!(closure.libraries()[0].starts_with("library LibAsset"));
    assert_eq!(closure.using_statements(), ["using LibAsset for address;".to_string()]);

    Ok(())
}

#[test]
fn constants_chain_through_other_constants() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_source(SOURCE);
    let query = FunctionQuery::named("spend").with_signature("spend(address asset, uint256 amount)");

    let resolution = resolver.resolve_and_collect(&query)?;
    let closure = resolution.closure().expect("function should resolve");

    // `NATIVE_ASSETID` is referenced by the library function, and its value
    // expression references `NULL_ADDRESS` in turn.
    assert!(closure.has_constant("NATIVE_ASSETID"));
    assert!(closure.has_constant("NULL_ADDRESS"));
    assert_eq!(closure.constants().len(), 2);

    Ok(())
}
