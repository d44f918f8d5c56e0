//! This module contains the target function resolution: locating the one
//! function definition a query's selector (or name) refers to, among
//! overloads, inherited overrides, and facet implementations.

use log::debug;

use crate::{
    parse::unit::{FunctionDef, SourceUnit},
    resolver::FunctionQuery,
    signature::{
        canonicalize_signature,
        types::{StructTupleMapping, TypeMapping},
        Selector,
    },
};

/// The explicit "no matching function" result.
///
/// This is a value rather than an error so the caller can retry the query
/// against another contract, chain, or facet; the candidate signatures are
/// included for diagnostics.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NotFound {
    /// The name that was searched for.
    pub name: String,

    /// The selector the search was keyed on, when one was known or could be
    /// computed.
    pub selector: Option<Selector>,

    /// The canonical signatures of the name-matching candidates that were
    /// considered and rejected.
    pub candidates: Vec<String>,
}

/// Locates the function definition that `query` refers to.
///
/// `scope` is the symbol table lookups are made against (the facet's own
/// table for a facet-scoped resolution, the merged table otherwise), and
/// `merged` the merged table used as a candidate fallback when a facet
/// declares none.
///
/// The search phases, each short-circuiting on first match:
///
/// 1. selector match walking the inheritance hierarchy most-derived first;
/// 2. selector match over all candidates when no hierarchy is available;
/// 3. name match walking the hierarchy, preferring non-virtual definitions
///    (skipped when the query demands selector-only matching);
/// 4. name match over all candidates, preferring non-virtual definitions and
///    breaking ties towards the highest start line.
///
/// # Errors
///
/// Returns [`NotFound`] when no phase produced a match.
pub(crate) fn resolve_target(
    scope: &SourceUnit,
    merged: &SourceUnit,
    query: &FunctionQuery,
) -> Result<FunctionDef, NotFound> {
    let types = TypeMapping::for_unit(scope);
    let structs = StructTupleMapping::for_unit(scope, &types);

    let target_selector = query.selector.or_else(|| {
        query.signature.as_ref().map(|signature| {
            let canonical = canonicalize_signature(signature, &types, &structs);
            let selector = Selector::of_canonical(&canonical);
            debug!("Query signature `{signature}` canonicalized to `{canonical}` ({selector})");
            selector
        })
    });

    // Candidates come from the scoped table; a facet whose table has no
    // name match falls back to the merged table.
    let mut from_scope = true;
    let mut candidates: Vec<&FunctionDef> = externally_callable(scope, &query.name);
    if candidates.is_empty() && !std::ptr::eq(scope, merged) {
        debug!("No facet candidates for `{}`; falling back to the merged table", query.name);
        from_scope = false;
        candidates = externally_callable(merged, &query.name);
    }

    // Interface-only declarations are ignored while any concrete candidate
    // exists.
    let concrete: Vec<&FunctionDef> =
        candidates.iter().copied().filter(|f| !f.is_interface_only()).collect();
    let pool = if concrete.is_empty() { candidates } else { concrete };

    let hierarchy = match scope.main_contract() {
        Some(main) => scope.inheritance().linearize(main),
        None => Vec::new(),
    };

    let canonical_of = |function: &FunctionDef| -> String {
        if from_scope {
            function.canonical_signature(&types, &structs).to_string()
        } else {
            // Candidates from the merged table must not poison their cached
            // canonical signatures with this facet's mappings.
            canonicalize_signature(&function.signature(), &types, &structs)
        }
    };

    // Phase 1: selector-first, inheritance-ordered.
    if let Some(selector) = target_selector {
        if !hierarchy.is_empty() {
            debug!("Phase 1: selector {selector} along hierarchy {hierarchy:?}");
            for contract in &hierarchy {
                for function in
                    pool.iter().filter(|f| f.contract.as_deref() == Some(contract.as_str()))
                {
                    let canonical = canonical_of(function);
                    let candidate_selector = Selector::of_canonical(&canonical);
                    debug!("  {canonical} -> {candidate_selector}");
                    if candidate_selector == selector {
                        debug!("Exact selector match in {contract}: {canonical}");
                        return Ok((*function).clone());
                    }
                }
            }
        } else {
            // Phase 2: selector-first with no hierarchy to order the walk.
            debug!("Phase 2: selector {selector} over {} candidates", pool.len());
            for function in &pool {
                let canonical = canonical_of(function);
                if Selector::of_canonical(&canonical) == selector {
                    debug!("Exact selector match: {canonical}");
                    return Ok((*function).clone());
                }
            }
        }
    }

    // Phase 3: name-first, inheritance-ordered.
    if !query.selector_only && !hierarchy.is_empty() {
        debug!("Phase 3: name match along hierarchy");
        for contract in &hierarchy {
            let in_contract: Vec<&&FunctionDef> =
                pool.iter().filter(|f| f.contract.as_deref() == Some(contract.as_str())).collect();
            if in_contract.is_empty() {
                continue;
            }

            let chosen = in_contract
                .iter()
                .find(|f| !f.is_virtual)
                .or_else(|| in_contract.first())
                .copied();
            if let Some(function) = chosen {
                debug!("Name match in {contract}: {}", function.signature());
                return Ok((**function).clone());
            }
        }
    }

    // Phase 4: fallback over all candidates, preferring non-virtual and the
    // most recently declared definition.
    if !query.selector_only && !pool.is_empty() {
        debug!("Phase 4: fallback over {} candidates", pool.len());
        let mut ordered: Vec<&FunctionDef> = pool.clone();
        ordered.sort_by_key(|f| std::cmp::Reverse(f.span.start));

        let chosen =
            ordered.iter().find(|f| !f.is_virtual).or_else(|| ordered.first()).copied();
        if let Some(function) = chosen {
            debug!("Fallback selected {} (line {})", function.signature(), function.span.start);
            return Ok(function.clone());
        }
    }

    let candidates = pool.iter().map(|f| canonical_of(f)).collect();
    Err(NotFound {
        name: query.name.clone(),
        selector: target_selector,
        candidates,
    })
}

/// Gets the externally callable (`public` or `external`) functions named
/// `name` in `unit`, in declaration order.
fn externally_callable<'a>(unit: &'a SourceUnit, name: &str) -> Vec<&'a FunctionDef> {
    unit.functions_named(name)
        .filter(|f| f.visibility.is_externally_callable())
        .collect()
}
