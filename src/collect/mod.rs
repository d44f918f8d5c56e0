//! This module contains the dependency-closure builder: the engine that,
//! starting from a resolved target function, recursively gathers every
//! declaration needed to read it in isolation and applies the line-budget
//! truncation policy.
//!
//! The walk is driven by three explicit work queues (plain calls, qualified
//! `Library.function` calls, and `super.` calls) with visited sets, polled
//! by the watchdog so adversarial inputs can be aborted.

pub mod state;

use std::collections::VecDeque;

use log::{debug, warn};

use crate::{
    closure::{DependencyClosure, Truncation},
    collect::state::CollectorState,
    constant::DEFAULT_TYPE_EXPANSION_ITERATIONS,
    error::resolution::{Error, Result},
    parse::unit::{FunctionDef, SourceUnit},
    signature::{
        struct_types_in_signature,
        types::{is_candidate_type_name, split_array_suffix},
    },
    utility::{contains_word, line_count},
    watchdog::DynWatchdog,
};

/// The configuration for the dependency collector.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// The maximum number of nested-type expansion rounds to run while
    /// chasing struct fields that are themselves structs or enums.
    ///
    /// The expansion normally reaches a fixed point well before this cap;
    /// the cap exists to bound pathological cross-referencing.
    pub max_type_iterations: usize,
}

impl Default for Config {
    fn default() -> Self {
        let max_type_iterations = DEFAULT_TYPE_EXPANSION_ITERATIONS;
        Self { max_type_iterations }
    }
}

/// The dependency collector for one resolution.
///
/// The collector reads from the facet-scoped symbol table when the
/// resolution is facet-scoped (`scope`), falling back to the merged table
/// (`merged`) only for lookups the scope cannot satisfy. For un-scoped
/// resolutions the two are the same unit.
pub struct Collector<'a> {
    /// The symbol table symbol lookups are made against.
    scope: &'a SourceUnit,

    /// The merged symbol table, used as a fallback.
    merged: &'a SourceUnit,

    /// The collector's configuration.
    config: Config,

    /// The watchdog polled between work-queue iterations.
    watchdog: DynWatchdog,
}

impl<'a> Collector<'a> {
    /// Creates a collector over the provided symbol tables.
    #[must_use]
    pub fn new(
        scope: &'a SourceUnit,
        merged: &'a SourceUnit,
        config: Config,
        watchdog: DynWatchdog,
    ) -> Self {
        Self {
            scope,
            merged,
            config,
            watchdog,
        }
    }

    /// Builds the dependency closure of `target`, truncating it to
    /// `line_budget` lines where necessary.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] only if the watchdog requests a stop; every other
    /// failure mode degrades to a smaller closure.
    pub fn collect(&self, target: &FunctionDef, line_budget: usize) -> Result<DependencyClosure> {
        let mut state = CollectorState::seed(target);

        self.include_referenced_structs(&mut state, target);
        self.expand_nested_types(&mut state);
        self.include_enums(&mut state, target);
        self.include_modifiers(&mut state, target);
        self.include_custom_types(&mut state, target);
        self.drain_queues(&mut state, target)?;
        self.include_using_and_libraries(&mut state);
        self.include_constants(&mut state);

        let truncation = truncate(&mut state, target, line_budget);
        Ok(state.into_closure(truncation))
    }

    /// Includes the structs referenced by the target's parameter signature
    /// or body.
    ///
    /// A struct may appear only in the parameter list (a calldata argument
    /// that the body never names), so both texts are searched. Struct types
    /// named in the signature but missing from the scoped symbol table are
    /// recovered from interface bodies in the raw source.
    fn include_referenced_structs(&self, state: &mut CollectorState, target: &FunctionDef) {
        let signature = target.signature();
        let searched = format!("{signature}\n{}", target.body);

        for (name, definition) in self.scope.structs().iter() {
            if searched.contains(name) && state.add_struct(name, definition.clone()) {
                debug!("Including struct `{name}`");
            }
        }

        for missing in struct_types_in_signature(&signature) {
            if state.struct_names.contains(&missing) {
                continue;
            }

            let found = self
                .scope
                .find_struct_anywhere(&missing)
                .or_else(|| self.merged.find_struct_anywhere(&missing));
            match found {
                Some(definition) => {
                    debug!("Including struct `{missing}` found in an interface");
                    state.add_struct(&missing, definition);
                }
                None => debug!("Struct `{missing}` from the signature was not found"),
            }
        }
    }

    /// Iteratively expands types referenced inside already-included structs
    /// until a fixed point (or the iteration cap) is reached.
    ///
    /// Qualified references such as `IStargate.SendParam` are looked up
    /// inside the named interface first and retried unqualified.
    fn expand_nested_types(&self, state: &mut CollectorState) {
        let mut to_process = state.structs.clone();
        let mut seen = state.struct_names.clone();

        for iteration in 0..self.config.max_type_iterations {
            if to_process.is_empty() {
                break;
            }

            let mut discovered = Vec::new();
            for definition in &to_process {
                for candidate in nested_type_candidates(definition) {
                    if !seen.contains(&candidate) && !discovered.contains(&candidate) {
                        discovered.push(candidate);
                    }
                }
            }

            if discovered.is_empty() {
                break;
            }
            debug!("Nested type round {iteration}: {discovered:?}");

            to_process = Vec::new();
            for reference in discovered {
                seen.insert(reference.clone());

                let definition = self.find_struct_for_reference(&reference);
                if let Some(definition) = definition {
                    if state.add_struct(&reference, definition.clone()) {
                        to_process.push(definition);
                    }
                }
                // References that are not structs are retried as enums in
                // the enum pass.
            }
        }
    }

    /// Resolves a (possibly qualified) type reference from a struct field to
    /// a struct definition, searching the scoped table first and the merged
    /// source as a fallback.
    fn find_struct_for_reference(&self, reference: &str) -> Option<String> {
        if let Some((interface, name)) = reference.split_once('.') {
            return self
                .scope
                .find_struct_in_interface(interface, name)
                .or_else(|| self.merged.find_struct_in_interface(interface, name))
                .or_else(|| self.scope.find_struct_anywhere(name))
                .or_else(|| self.merged.find_struct_anywhere(name));
        }

        self.scope
            .structs()
            .get(reference)
            .cloned()
            .or_else(|| self.scope.find_struct_anywhere(reference))
            .or_else(|| self.merged.find_struct_anywhere(reference))
    }

    /// Includes the enums referenced by the target's text or by any included
    /// struct, retrying unresolved struct-field types as interface enums.
    fn include_enums(&self, state: &mut CollectorState, target: &FunctionDef) {
        let mut searched = format!("{}\n{}", target.signature(), target.body);
        for definition in &state.structs {
            searched.push('\n');
            searched.push_str(definition);
        }

        for (name, definition) in self.scope.enums().iter() {
            if searched.contains(name) && state.add_enum(name, definition.clone()) {
                debug!("Including enum `{name}`");
            }
        }

        // Struct fields whose types resolved to neither a struct nor an
        // already-included enum may be enums declared inside interfaces.
        let mut candidates = Vec::new();
        for definition in &state.structs {
            for candidate in nested_type_candidates(definition) {
                let unqualified = candidate.rsplit('.').next().unwrap_or(&candidate).to_string();
                if !candidates.contains(&unqualified) {
                    candidates.push(unqualified);
                }
            }
        }

        for candidate in candidates {
            if state.struct_names.contains(&candidate) || state.enum_names.contains(&candidate) {
                continue;
            }

            let found = self
                .scope
                .find_enum_anywhere(&candidate)
                .or_else(|| self.merged.find_enum_anywhere(&candidate));
            if let Some(definition) = found {
                debug!("Including enum `{candidate}` found in an interface");
                state.add_enum(&candidate, definition);
            }
        }
    }

    /// Includes the modifiers invoked by the target function, verbatim.
    fn include_modifiers(&self, state: &mut CollectorState, target: &FunctionDef) {
        for name in &target.modifiers {
            match self.scope.modifiers().get(name) {
                Some(definition) => {
                    debug!("Including modifier `{name}`");
                    state.total_lines += line_count(definition);
                    state.modifiers.push(definition.clone());
                }
                None => debug!("Modifier `{name}` is not defined in the scoped source"),
            }
        }
    }

    /// Includes the custom value types referenced by the target's body or by
    /// any included struct.
    fn include_custom_types(&self, state: &mut CollectorState, target: &FunctionDef) {
        for (name, declaration) in self.scope.custom_types().iter() {
            let referenced = target.body.contains(name)
                || state.structs.iter().any(|definition| definition.contains(name));
            if referenced {
                debug!("Including custom type `{name}`");
                state.total_lines += line_count(declaration);
                state.custom_types.push(declaration.clone());
                state.used_custom_types.push(name.to_string());
            }
        }
    }

    /// Drains the three work queues until no call remains unresolved,
    /// polling the watchdog as it goes.
    ///
    /// Each queue can feed the others: a parent implementation found for a
    /// `super.` call is scanned for plain and qualified calls, and every
    /// found function is scanned for further calls of all three kinds.
    fn drain_queues(&self, state: &mut CollectorState, target: &FunctionDef) -> Result<()> {
        let polling_interval = self.watchdog.poll_every();
        let mut counter = 0usize;

        while !state.queues_are_empty() {
            counter += 1;
            if counter % polling_interval == 0 && self.watchdog.should_stop() {
                return Err(Error::StoppedByWatchdog);
            }

            if let Some(name) = state.internal_queue.pop_front() {
                self.process_plain_call(state, target, &name);
                continue;
            }
            if let Some(call) = state.library_queue.pop_front() {
                self.process_qualified_call(state, target, &call);
                continue;
            }
            if let Some(name) = state.super_queue.pop_front() {
                self.process_super_call(state, target, &name);
            }
        }

        Ok(())
    }

    /// Resolves one plain call by name through the four-tier search order
    /// and folds the found function into the closure.
    fn process_plain_call(&self, state: &mut CollectorState, target: &FunctionDef, name: &str) {
        if !state.processed_internal.insert(name.to_string()) {
            return;
        }

        let main = target.contract.as_deref();
        let target_signature = target.signature();

        // Internal function in the owning contract, internal function
        // anywhere, public/external in the owning contract, public/external
        // anywhere. The target itself is excluded by full signature so that
        // overloads of its own name still resolve.
        let found = self
            .scope
            .functions_named(name)
            .find(|f| {
                f.visibility.is_internal()
                    && !f.is_declaration_only
                    && main.is_some()
                    && f.contract.as_deref() == main
            })
            .or_else(|| {
                self.scope
                    .functions_named(name)
                    .find(|f| f.visibility.is_internal() && !f.is_declaration_only)
            })
            .or_else(|| {
                self.scope.functions_named(name).find(|f| {
                    f.visibility.is_externally_callable()
                        && !f.is_declaration_only
                        && main.is_some()
                        && f.contract.as_deref() == main
                        && f.signature() != target_signature
                })
            })
            .or_else(|| {
                self.scope.functions_named(name).find(|f| {
                    f.visibility.is_externally_callable()
                        && !f.is_declaration_only
                        && f.signature() != target_signature
                })
            });

        match found {
            Some(function) => {
                debug!(
                    "Including function `{name}` from {}",
                    function.contract.as_deref().unwrap_or("a library or file scope")
                );
                if state.add_internal_function(function) {
                    state.enqueue_calls_from(&function.body);
                }
            }
            None => debug!("Call `{name}()` did not resolve to a known function"),
        }
    }

    /// Resolves one qualified `Library.function` call and folds the found
    /// function into the closure.
    fn process_qualified_call(
        &self,
        state: &mut CollectorState,
        target: &FunctionDef,
        call: &(String, String),
    ) {
        if !state.processed_library.insert(call.clone()) {
            return;
        }

        let (qualifier, name) = call;

        // `Interface.Struct(...)` constructions look like qualified calls
        // but name a type, not a function.
        if name.chars().next().is_some_and(char::is_uppercase) {
            debug!("Skipping `{qualifier}.{name}`: a type constructor, not a call");
            return;
        }

        state.note_library(qualifier);

        let target_signature = target.signature();
        let found = self
            .scope
            .functions_named(name)
            .find(|f| f.visibility.is_internal() && !f.is_declaration_only)
            .or_else(|| {
                self.scope
                    .functions_named(name)
                    .find(|f| !f.is_declaration_only && f.signature() != target_signature)
            })
            .or_else(|| {
                // The facet's own table can miss library code that only the
                // merged source carries.
                self.merged
                    .functions_named(name)
                    .find(|f| !f.is_declaration_only && f.signature() != target_signature)
            });

        match found {
            Some(function) => {
                debug!("Including library function `{qualifier}.{name}`");
                if state.add_internal_function(function) {
                    // Library bodies are scanned for further qualified
                    // calls; their plain calls stay local to the library.
                    for nested in crate::parse::scan::library_call_sites(&function.body) {
                        if !state.processed_library.contains(&nested) {
                            state.library_queue.push_back(nested);
                        }
                    }
                }
            }
            None => warn!("Library function `{qualifier}.{name}` was not found in the source"),
        }
    }

    /// Resolves one `super.` call by walking the owning contract's
    /// linearized ancestry and locating the name in each ancestor in turn.
    fn process_super_call(&self, state: &mut CollectorState, target: &FunctionDef, name: &str) {
        if !state.processed_super.insert(name.to_string()) {
            return;
        }

        let owners: Vec<String> = match &target.contract {
            Some(owner) => vec![owner.clone()],
            None => self.scope.contract_names.clone(),
        };

        for owner in owners {
            for unit in [self.scope, self.merged] {
                let ancestry = unit.inheritance().linearize(&owner);
                for ancestor in ancestry.iter().skip(1) {
                    let found = unit.functions_named(name).find(|f| {
                        f.contract.as_deref() == Some(ancestor.as_str()) && !f.is_declaration_only
                    });

                    if let Some(function) = found {
                        debug!("Including parent implementation {ancestor}.{name}()");
                        state.add_parent_function(function, ancestor);
                        state.enqueue_calls_from(&function.body);
                        return;
                    }
                }
            }
        }

        warn!("No parent implementation found for super.{name}()");
    }

    /// Includes the `using` statements relevant to the included custom types
    /// and referenced libraries, then the referenced libraries' full
    /// definitions.
    fn include_using_and_libraries(&self, state: &mut CollectorState) {
        // A custom type's operations often live in a library attached via
        // `using`; pull those libraries in too.
        for statement in self.scope.using_statements() {
            for type_name in &state.used_custom_types.clone() {
                if !contains_word(statement, type_name) {
                    continue;
                }
                if let Some((library, _)) = parse_using_statement(statement) {
                    debug!("Library `{library}` attached to `{type_name}` via using statement");
                    state.note_library(&library);
                }
            }
        }

        for statement in self.scope.using_statements() {
            let relevant = state
                .used_custom_types
                .iter()
                .any(|type_name| contains_word(statement, type_name))
                || state
                    .referenced_libraries
                    .iter()
                    .any(|library| contains_word(statement, library));

            if relevant {
                debug!("Including using statement `{statement}`");
                state.total_lines += line_count(statement);
                state.using_statements.push(statement.clone());
            }
        }

        for library in &state.referenced_libraries.clone() {
            if let Some(definition) = self.scope.libraries().get(library) {
                debug!("Including full library `{library}`");
                state.total_lines += line_count(definition);
                state.libraries.push(definition.clone());
            }
        }
    }

    /// Includes the constants referenced by the collected code: a first pass
    /// over the target, internal, and parent bodies, then repeated passes
    /// over the included constants' own value expressions until no new
    /// constant appears.
    fn include_constants(&self, state: &mut CollectorState) {
        let mut to_check: VecDeque<String> = VecDeque::new();

        for (name, declaration) in self.scope.constants().iter() {
            if contains_word(&state.scanned_code, name) {
                debug!("Including constant `{name}`");
                state.add_constant(name, declaration.clone());
                to_check.push_back(declaration.clone());
            }
        }

        // A constant's value may itself name another constant, e.g.
        // `NATIVE_ASSETID = NULL_ADDRESS`.
        while let Some(declaration) = to_check.pop_front() {
            for (name, candidate) in self.scope.constants().iter() {
                if state.constant_names.contains(name) {
                    continue;
                }
                if contains_word(&declaration, name) {
                    debug!("Including chained constant `{name}`");
                    state.add_constant(name, candidate.clone());
                    to_check.push_back(candidate.clone());
                }
            }
        }
    }
}

/// Applies the truncation policy and reports what was done.
///
/// The target function is never dropped. If the target plus the collected
/// structs and enums already exceed the budget, every supporting section
/// that competes for reading attention (structs, enums, internal functions)
/// is dropped; otherwise internal functions are kept greedily in discovery
/// order until the remaining budget runs out.
fn truncate(state: &mut CollectorState, target: &FunctionDef, line_budget: usize) -> Truncation {
    if state.total_lines <= line_budget {
        return Truncation::None;
    }

    let struct_lines: usize = state.structs.iter().map(|s| line_count(s)).sum();
    let enum_lines: usize = state.enums.iter().map(|e| line_count(e)).sum();
    let reserved = target.line_count() + struct_lines + enum_lines;

    let truncation = if reserved > line_budget {
        warn!(
            "Target function with structs and enums exceeds the budget of {line_budget} lines; \
             keeping only the function"
        );
        state.structs.clear();
        state.enums.clear();
        state.internal_functions.clear();
        Truncation::FunctionOnly
    } else {
        let mut available = line_budget - reserved;
        let original = state.internal_functions.len();

        let mut kept = Vec::new();
        for function in state.internal_functions.drain(..) {
            let lines = line_count(&function.body);
            if available >= lines {
                available -= lines;
                kept.push(function);
            } else {
                break;
            }
        }

        let dropped = original - kept.len();
        warn!("Budget of {line_budget} lines exceeded; dropped {dropped} internal functions");
        state.internal_functions = kept;
        Truncation::InternalFunctionsDropped(dropped)
    };

    state.total_lines = recompute_total_lines(state, target);
    truncation
}

/// Recomputes the closure's line total from its remaining sections.
fn recompute_total_lines(state: &CollectorState, target: &FunctionDef) -> usize {
    let sections = state
        .structs
        .iter()
        .chain(&state.enums)
        .chain(&state.custom_types)
        .chain(&state.using_statements)
        .chain(&state.libraries)
        .chain(&state.modifiers)
        .chain(&state.constants)
        .map(|text| line_count(text))
        .sum::<usize>();

    let functions = state
        .internal_functions
        .iter()
        .map(|function| line_count(&function.body))
        .chain(state.parent_functions.iter().map(|function| line_count(&function.body)))
        .sum::<usize>();

    target.line_count() + sections + functions
}

/// Extracts the type names referenced by a struct definition's fields:
/// capitalized, non-primitive first tokens, with qualified references kept
/// whole.
fn nested_type_candidates(definition: &str) -> Vec<String> {
    let Some(open) = definition.find('{') else {
        return Vec::new();
    };
    let Some(close) = definition.rfind('}') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for field in definition[open + 1..close].split(';') {
        let field = field.trim();
        let Some(first_token) = field.split_whitespace().next() else {
            continue;
        };
        let (base, _) = split_array_suffix(first_token);

        if is_candidate_type_name(base) && !candidates.iter().any(|seen| seen == base) {
            candidates.push(base.to_string());
        }
    }

    candidates
}

/// Parses a `using Library for Type;` statement into its library and type
/// parts.
fn parse_using_statement(statement: &str) -> Option<(String, String)> {
    let mut tokens = statement.split_whitespace();
    if tokens.next() != Some("using") {
        return None;
    }

    let library = tokens.next()?.to_string();
    if tokens.next() != Some("for") {
        return None;
    }
    let type_name = tokens.next()?.trim_end_matches(';').to_string();

    Some((library, type_name))
}

#[cfg(test)]
mod test {
    use super::{nested_type_candidates, parse_using_statement};

    #[test]
    fn finds_nested_type_candidates_in_struct_fields() {
        let definition = "struct Outer {\n\
             Inner inner;\n\
             IStargate.SendParam param;\n\
             uint256 amount;\n\
             address owner;\n\
             Claim[] claims;\n\
         }";

        assert_eq!(
            nested_type_candidates(definition),
            vec!["Inner", "IStargate.SendParam", "Claim"]
        );
    }

    #[test]
    fn parses_using_statements() {
        assert_eq!(
            parse_using_statement("using LibAsset for address;"),
            Some(("LibAsset".to_string(), "address".to_string()))
        );
        assert_eq!(parse_using_statement("import LibAsset;"), None);
    }
}
