//! This module contains the definition of the resolver itself.

pub mod state;
pub mod target;

pub use target::NotFound;

use std::sync::Arc;

use crate::{
    cache::{CacheKey, ParseCache},
    closure::DependencyClosure,
    collect::{self, Collector},
    constant::DEFAULT_LINE_BUDGET,
    contract::Contract,
    error,
    facet::FacetScope,
    parse::unit::SourceUnit,
    resolver::state::State,
    signature::Selector,
    watchdog::DynWatchdog,
};

/// Creates a new resolver wrapping the provided `contract`, and with the
/// provided `collect_config` and `watchdog`.
#[must_use]
pub fn new(
    contract: Contract,
    collect_config: collect::Config,
    watchdog: DynWatchdog,
) -> Resolver<state::HasSource> {
    let state = state::HasSource {
        collect_config,
        watchdog,
    };
    Resolver { contract, state }
}

/// One request to resolve a function and collect its dependency closure.
#[derive(Clone, Debug)]
pub struct FunctionQuery {
    /// The name of the function.
    pub name: String,

    /// The full human-written signature, with parameter names, when the
    /// caller has one. Used only to compute a target selector.
    pub signature: Option<String>,

    /// A selector override, typically taken from a decoded transaction.
    /// Takes precedence over the signature.
    pub selector: Option<Selector>,

    /// Whether only an exact selector match is acceptable. When set, the
    /// name-based phases are skipped and a miss is reported as not found so
    /// the caller can retry elsewhere.
    pub selector_only: bool,

    /// The number of output lines the closure may occupy.
    pub line_budget: usize,
}

impl FunctionQuery {
    /// Creates a query for the function `name` with the default line budget.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let signature = None;
        let selector = None;
        let selector_only = false;
        let line_budget = DEFAULT_LINE_BUDGET;
        Self {
            name,
            signature,
            selector,
            selector_only,
            line_budget,
        }
    }

    /// Attaches the full human-written `signature` the target selector
    /// should be computed from.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Attaches a known target `selector`.
    #[must_use]
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Demands an exact selector match, disabling the name-based fallback
    /// phases.
    #[must_use]
    pub fn selector_only(mut self) -> Self {
        self.selector_only = true;
        self
    }

    /// Sets the number of output lines the closure may occupy.
    #[must_use]
    pub fn with_line_budget(mut self, line_budget: usize) -> Self {
        self.line_budget = line_budget;
        self
    }
}

/// The outcome of a full resolution request.
#[derive(Clone, Debug)]
pub enum Resolution {
    /// The target function was found and its closure collected.
    Resolved(DependencyClosure),

    /// No function matched the query; the caller can retry against another
    /// contract, chain, or facet.
    NotFound(NotFound),
}

impl Resolution {
    /// Gets the collected closure, if the target function was found.
    #[must_use]
    pub fn closure(&self) -> Option<&DependencyClosure> {
        match self {
            Self::Resolved(closure) => Some(closure),
            Self::NotFound(_) => None,
        }
    }

    /// Consumes the resolution into the collected closure, if the target
    /// function was found.
    #[must_use]
    pub fn into_closure(self) -> Option<DependencyClosure> {
        match self {
            Self::Resolved(closure) => Some(closure),
            Self::NotFound(_) => None,
        }
    }

    /// Checks whether the target function was found.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// The outcome of the target-resolution step of the pipeline.
#[allow(clippy::large_enum_variant)] // The resolver is boxed
pub enum ResolveOutcome {
    /// The target was located; the resolver is ready to collect its closure.
    Found(Box<Resolver<state::TargetResolved>>),

    /// No function matched the query.
    NotFound(NotFound),
}

/// The core of the dependency-closure analysis, the `Resolver` is
/// responsible for ingesting contract source text and outputting the
/// dependency closure of one function.
///
/// # Enforcing Valid State Transitions
///
/// The resolver enforces that only correct state transitions can occur
/// through use of structs that implement the exact state required by it at
/// any given point.
///
/// There is the [`Self::state`] function that provides access to the state
/// data of whichever state the resolver is currently in.
pub struct Resolver<S: State> {
    /// The contract whose source is being resolved against.
    contract: Contract,

    /// The internal state of the resolver.
    state: S,
}

/// The safe operations available in all states.
impl<S: State> Resolver<S> {
    /// Gets a reference to the contract being resolved against.
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Gets an immutable reference to the current state of the resolver.
    pub fn state(&self) -> &S {
        &self.state
    }
}

/// Unsafe operations available in all states.
///
/// These operations are capable of **violating the state invariants** of the
/// resolver, and must be used with the _utmost_ care.
impl<S: State> Resolver<S> {
    /// Forces the resolver into `new_state`, disregarding any safety with
    /// regards to state transitions.
    ///
    /// # Safety
    ///
    /// Do not force a state transition for the resolver unless you totally
    /// understand the state that the resolver is in, and the implications of
    /// doing so.
    pub unsafe fn set_state<NS: State>(self, new_state: NS) -> Resolver<NS> {
        Resolver {
            contract: self.contract,
            state:    new_state,
        }
    }

    /// Forces the resolver into the state `NS`, with the value of the state
    /// created by applying `transform` to the resolver's current state and
    /// disregarding any safety with regard to state transitions.
    ///
    /// # Safety
    ///
    /// Do not force a state transition for the resolver unless you totally
    /// understand the state that the resolver is in, and the implications of
    /// doing so.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the provided `transform` returns [`Err`].
    pub unsafe fn transform_state<NS: State>(
        self,
        transform: impl FnOnce(S) -> error::Result<NS>,
    ) -> error::Result<Resolver<NS>> {
        let state = transform(self.state)?;
        let contract = self.contract;

        Ok(Resolver { contract, state })
    }
}

/// A type that allows the user to easily name the initial state of the
/// resolver.
pub type InitialResolver = Resolver<state::HasSource>;

/// Operations available on a newly-created resolver.
impl Resolver<state::HasSource> {
    /// Executes the resolution process from beginning to end, performing all
    /// the intermediate steps automatically and returning the outcome.
    ///
    /// This is the sole operation most callers need: it parses the source,
    /// locates the function the query refers to, and collects its dependency
    /// closure within the query's line budget.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the watchdog stops the resolver. A missing target
    /// function is not an error; it is reported as
    /// [`Resolution::NotFound`].
    pub fn resolve_and_collect(self, query: &FunctionQuery) -> error::Result<Resolution> {
        match self.parse().resolve(query) {
            ResolveOutcome::Found(resolver) => {
                let collected = resolver.collect()?;
                Ok(Resolution::Resolved(collected.into_closure()))
            }
            ResolveOutcome::NotFound(not_found) => Ok(Resolution::NotFound(not_found)),
        }
    }

    /// As [`Self::resolve_and_collect`], but reusing parsed units from the
    /// provided `cache` across resolutions of the same deployment.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the watchdog stops the resolver.
    pub fn resolve_and_collect_with_cache(
        self,
        query: &FunctionQuery,
        cache: &ParseCache,
    ) -> error::Result<Resolution> {
        match self.parse_with_cache(cache).resolve(query) {
            ResolveOutcome::Found(resolver) => {
                let collected = resolver.collect()?;
                Ok(Resolution::Resolved(collected.into_closure()))
            }
            ResolveOutcome::NotFound(not_found) => Ok(Resolution::NotFound(not_found)),
        }
    }

    /// Parses the contract's source text (and any facet sources) into symbol
    /// tables.
    #[must_use]
    pub fn parse(self) -> Resolver<state::ParseComplete> {
        let unit = Arc::new(SourceUnit::parse(self.contract.source()));
        let facets = self.build_facet_scope(|_address, source| Arc::new(SourceUnit::parse(source)));

        self.into_parse_complete(unit, facets)
    }

    /// As [`Self::parse`], but consulting `cache` so repeated resolutions of
    /// the same deployment parse its source only once.
    #[must_use]
    pub fn parse_with_cache(self, cache: &ParseCache) -> Resolver<state::ParseComplete> {
        let chain = self.contract.chain();
        let fingerprint = self.contract.facets().map_or(0, crate::contract::FacetHint::fingerprint);

        let key = CacheKey::new(chain, self.contract.address(), fingerprint);
        let unit = cache.get_or_parse(key, || self.contract.source().to_string());

        let facets = self.build_facet_scope(|address, source| {
            cache.get_or_parse(CacheKey::new(chain, address, 0), || source.to_string())
        });

        self.into_parse_complete(unit, facets)
    }

    /// Builds the facet scope from the contract's facet hint, parsing each
    /// facet's source through `parse_unit`.
    fn build_facet_scope(
        &self,
        mut parse_unit: impl FnMut(&str, &str) -> Arc<SourceUnit>,
    ) -> FacetScope {
        let mut facets = FacetScope::new();

        if let Some(hint) = self.contract.facets() {
            for (address, source) in &hint.sources {
                facets.register_unit(address.clone(), parse_unit(address, source));
            }
            for (selector, entries) in &hint.selectors {
                for entry in entries {
                    facets.record_selector(*selector, entry.clone());
                }
            }
        }

        facets
    }

    /// Wraps the parsed tables into the parse-complete state.
    #[allow(clippy::missing_panics_doc)] // Explicit closure can never return Err
    fn into_parse_complete(
        self,
        unit: Arc<SourceUnit>,
        facets: FacetScope,
    ) -> Resolver<state::ParseComplete> {
        unsafe {
            // Safe to unwrap as we guarantee that the internal operations
            // cannot fail.
            self.transform_state(|old_state| {
                let collect_config = old_state.collect_config;
                let watchdog = old_state.watchdog;
                Ok(state::ParseComplete {
                    unit,
                    facets,
                    collect_config,
                    watchdog,
                })
            })
            .expect("Explicit closure cannot return Err")
        }
    }
}

/// Operations available on a resolver that has parsed the source text.
impl Resolver<state::ParseComplete> {
    /// Locates the function definition that `query` refers to, scoping the
    /// search to the serving facet when the query's selector maps to one.
    #[allow(clippy::missing_panics_doc)] // Explicit closure can never return Err
    #[must_use]
    pub fn resolve(self, query: &FunctionQuery) -> ResolveOutcome {
        let scoped = query
            .selector
            .and_then(|selector| self.state.facets.unit_for(&selector, self.contract.chain()));
        let scope: &SourceUnit = scoped.as_deref().unwrap_or(&self.state.unit);

        match target::resolve_target(scope, &self.state.unit, query) {
            Ok(target) => {
                let line_budget = query.line_budget;
                let resolver = unsafe {
                    // Safe to unwrap as we guarantee that the internal
                    // operations cannot fail.
                    self.transform_state(|old_state| {
                        let unit = old_state.unit;
                        let collect_config = old_state.collect_config;
                        let watchdog = old_state.watchdog;
                        Ok(state::TargetResolved {
                            unit,
                            scoped,
                            target,
                            line_budget,
                            collect_config,
                            watchdog,
                        })
                    })
                    .expect("Explicit closure cannot return Err")
                };
                ResolveOutcome::Found(Box::new(resolver))
            }
            Err(not_found) => ResolveOutcome::NotFound(not_found),
        }
    }
}

/// Operations available on a resolver that has located its target function.
impl Resolver<state::TargetResolved> {
    /// Collects the dependency closure of the resolved target within the
    /// query's line budget.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the watchdog stops the resolver.
    pub fn collect(self) -> error::Result<Resolver<state::ClosureComplete>> {
        unsafe {
            self.transform_state(|old_state| {
                let scope = old_state.scoped.as_deref().unwrap_or(&old_state.unit);
                let collector = Collector::new(
                    scope,
                    &old_state.unit,
                    old_state.collect_config,
                    old_state.watchdog.clone(),
                );
                let closure = collector.collect(&old_state.target, old_state.line_budget)?;
                Ok(state::ClosureComplete { closure })
            })
        }
    }
}

/// Operations available on a resolver that has collected the dependency
/// closure.
impl Resolver<state::ClosureComplete> {
    /// Gets the collected dependency closure.
    #[must_use]
    pub fn closure(&self) -> &DependencyClosure {
        &self.state.closure
    }

    /// Consumes the resolver into the collected dependency closure.
    #[must_use]
    pub fn into_closure(self) -> DependencyClosure {
        self.state.closure
    }
}
