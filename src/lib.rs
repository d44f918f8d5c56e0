//! This library implements an analysis of
//! [Solidity](https://soliditylang.org/) source text that, given a target
//! function's name or 4-byte selector, locates the _exact_ implementation the
//! selector refers to and collects the minimal set of declarations needed to
//! read that function in isolation. It is a _best effort_ analysis over
//! untrusted, possibly-flattened source; it is not a compiler and does not
//! aim to become one.
//!
//! # How it Works
//!
//! From a very high level, the resolution process is performed as follows:
//!
//! 1. Source text is ingested and turned into a
//!    [`parse::unit::SourceUnit`]: a symbol table of the structs, enums,
//!    constants, custom value types, `using` statements, libraries,
//!    modifiers, and functions declared in the text, built by keyword
//!    scanning with explicit brace and parenthesis balancing.
//! 2. User-defined types are reduced to their ABI-primitive forms
//!    ([`signature::types::TypeMapping`] and
//!    [`signature::types::StructTupleMapping`]), so that any function
//!    signature can be canonicalized and hashed into its
//!    [`signature::Selector`].
//! 3. For diamond deployments, a caller-supplied [`facet::FacetScope`]
//!    restricts all symbol lookups to the facet that actually serves the
//!    requested selector, so same-named types in unrelated facets cannot
//!    corrupt the resolution.
//! 4. The [`resolver::Resolver`] walks the contract's linearized inheritance
//!    hierarchy to find the one definition whose canonical selector matches
//!    the request, falling back to name-based matching when no selector is
//!    available.
//! 5. The [`collect::Collector`] expands the resolved function into a
//!    [`DependencyClosure`]: referenced structs and enums (recursively),
//!    invoked modifiers, transitively called internal and library functions,
//!    parent implementations reached through `super.` calls, and referenced
//!    constants, truncated deterministically to the caller's line budget.
//!
//! # Basic Usage
//!
//! For the most basic usage of the library, it is sufficient to construct a
//! resolver and call the `.resolve_and_collect` method, passing your
//! contract's source and a query.
//!
//! ```
//! use dependency_closure_extractor as dce;
//! use dependency_closure_extractor::{
//!     chain::ChainId,
//!     collect,
//!     contract::Contract,
//!     resolver::FunctionQuery,
//!     watchdog::LazyWatchdog,
//! };
//!
//! let source = r#"
//! contract Vault {
//!     uint256 internal constant FEE_DENOMINATOR = 10_000;
//!
//!     function withdraw(uint256 amount, address receiver) external {
//!         _takeFee(amount);
//!     }
//!
//!     function _takeFee(uint256 amount) internal {
//!         amount / FEE_DENOMINATOR;
//!     }
//! }
//! "#;
//!
//! let contract = Contract::new(source, "0x5e8422345238f34275888049021821e8e08caa1f", ChainId::ETHEREUM);
//! let query = FunctionQuery::named("withdraw")
//!     .with_signature("withdraw(uint256 amount, address receiver)")
//!     .with_line_budget(120);
//!
//! let resolution = dce::new(contract, collect::Config::default(), LazyWatchdog.in_rc())
//!     .resolve_and_collect(&query)
//!     .unwrap();
//!
//! let closure = resolution.closure().unwrap();
//! assert!(closure.function().contains("withdraw"));
//! assert!(closure.has_internal_function("_takeFee"));
//! assert!(closure.has_constant("FEE_DENOMINATOR"));
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod cache;
pub mod chain;
pub mod closure;
pub mod collect;
pub mod constant;
pub mod contract;
pub mod data;
pub mod error;
pub mod facet;
pub mod inheritance;
pub mod parse;
pub mod resolver;
pub mod signature;
pub mod utility;
pub mod watchdog;

// Re-exports to provide the library interface.
pub use closure::DependencyClosure;
pub use resolver::new;
